#![forbid(unsafe_code)]

//! The scheme view: keeps the visual cell graph a faithful projection of
//! the observable track graph, and the track graph updated when cells are
//! edited directly.
//!
//! # Design
//!
//! [`SchemeView`] owns the observable graph and a mirror (cell graph +
//! identity map + last layout) behind an `Rc<RefCell<_>>`. A subscriber
//! registered on the graph at construction materializes every structural
//! mutation into cells, whoever performed it. Edits that originate in the
//! view flow the other way: the view updates the cells and the identity
//! map first, then mutates the graph with the materialization subscriber
//! muted, so neither direction echoes into the other.
//!
//! Everything is single-threaded and synchronous; listeners are invoked in
//! registration order and observe fully-applied state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ltrack_graph::{
    Detection, DetectionId, GraphEvent, LinkId, ObservableTrackGraph, TrackGraph,
};
use ltrack_layout::{CELL_WIDTH, SchemeLayout, clamped_cell_height, staging_position};
use rustc_hash::FxHashMap;

use crate::cell::{Cell, CellId, CellStyle, Geometry};
use crate::cell_graph::{CellChange, CellGraph, ObserverId};
use crate::config::SchemeConfig;
use crate::identity::IdentityMap;
use crate::selection::SelectionDelta;

/// Weight given to links created by direct cell linking.
const DEFAULT_LINK_WEIGHT: f64 = 1.0;

// ============================================================================
// External contracts
// ============================================================================

/// Batched detection lifecycle notifications consumed from the tracking
/// layer (manual creation, edits, and deletion performed elsewhere).
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    /// New detections to adopt into the graph and the view.
    Created(Vec<Detection>),
    /// Detections whose attributes (radius, thumbnail) changed.
    Modified(Vec<DetectionId>),
    /// Detections to remove everywhere.
    Deleted(Vec<DetectionId>),
}

/// Observer of structural edits that originate in the view (a user deleted
/// cells or drew a link). Domain-origin mutations are *not* reported here;
/// subscribe on the observable graph for those.
pub trait GraphListener {
    fn detection_added(&mut self, _id: DetectionId) {}
    fn detection_removed(&mut self, _id: DetectionId) {}
    fn link_added(&mut self, _id: LinkId) {}
    fn link_removed(&mut self, _id: LinkId) {}
}

/// One settled selection change.
///
/// `detections`/`links` are the full selection after the change, rebuilt
/// from the live native selection. The transition maps mark what moved:
/// `true` = just selected, `false` = just deselected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionChange {
    pub detections: Vec<DetectionId>,
    pub links: Vec<LinkId>,
    pub detection_transitions: FxHashMap<DetectionId, bool>,
    pub link_transitions: FxHashMap<LinkId, bool>,
}

/// Observer of settled selection changes.
pub trait SelectionListener {
    fn selection_changed(&mut self, change: &SelectionChange);
}

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ls{}", self.0)
    }
}

/// Violation found by [`SchemeView::check_consistency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyError {
    /// A mapped detection is no longer live in the graph.
    DeadDetection(DetectionId),
    /// A mapped link is no longer live in the graph.
    DeadLink(LinkId),
    /// A mapped cell is no longer live in the cell graph.
    DeadCell(CellId),
    /// A mapping points at a cell of the wrong kind.
    KindMismatch(CellId),
    /// The identity tables disagree between directions.
    OneSidedEntry,
    /// An edge-cell has no link mapping.
    UnmappedEdgeCell(CellId),
    /// A plain vertex-cell has no detection mapping.
    UnmappedVertexCell(CellId),
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadDetection(id) => write!(f, "identity map holds dead detection {id}"),
            Self::DeadLink(id) => write!(f, "identity map holds dead link {id}"),
            Self::DeadCell(id) => write!(f, "identity map holds dead cell {id}"),
            Self::KindMismatch(id) => write!(f, "cell {id} is mapped as the wrong kind"),
            Self::OneSidedEntry => write!(f, "identity tables disagree between directions"),
            Self::UnmappedEdgeCell(id) => write!(f, "edge cell {id} has no link mapping"),
            Self::UnmappedVertexCell(id) => write!(f, "vertex cell {id} has no detection mapping"),
        }
    }
}

impl std::error::Error for ConsistencyError {}

// ============================================================================
// Mirror
// ============================================================================

/// Embedded image reference for a thumbnail payload.
fn image_reference(thumbnail: &[u8]) -> Option<String> {
    if thumbnail.is_empty() {
        return None;
    }
    Some(format!("data:image/base64,{}", BASE64.encode(thumbnail)))
}

/// The visual half of the view: cells, identity map, and the last layout.
struct Mirror {
    cells: CellGraph,
    ids: IdentityMap,
    layout: SchemeLayout,
    config: SchemeConfig,
    /// While set, graph events are not materialized; the current caller
    /// is handling the visual side itself.
    muted: bool,
}

impl Mirror {
    fn apply_graph_event(&mut self, graph: &TrackGraph, event: &GraphEvent) {
        match *event {
            GraphEvent::DetectionAdded(id) => self.create_staged_detection_cell(graph, id),
            GraphEvent::DetectionRemoved(id) => self.remove_detection_cell(id),
            GraphEvent::LinkAdded(id) => self.create_link_cell(graph, id),
            GraphEvent::LinkRemoved(id) => self.remove_link_cell(id),
        }
    }

    /// Materialize an entire graph in one transaction. Positions come from
    /// the current layout.
    fn materialize_graph(&mut self, graph: &TrackGraph) {
        self.cells.begin_update();
        for id in graph.detection_ids() {
            self.create_placed_detection_cell(graph, id);
        }
        for link in graph.link_ids() {
            self.create_link_cell(graph, link);
        }
        self.cells.end_update();
    }

    /// Geometry for a cell created between layout passes: staged to the
    /// right of the occupied columns, on the row of its instant.
    fn staged_geometry(&self, detection: &Detection) -> Geometry {
        let row = match self.layout.row_of(detection.instant()) {
            Some(row) => row,
            None => {
                tracing::debug!(
                    instant = %detection.instant(),
                    "instant missing from row grid; staging below the known rows",
                );
                self.layout.row_count()
            }
        };
        let (x, y) = staging_position(self.layout.next_column(), row);
        let height = clamped_cell_height(detection.radius(), self.config.calibration);
        Geometry::new(x, y, CELL_WIDTH, height)
    }

    fn spawn_vertex_cell(&mut self, detection: &Detection, geometry: Geometry) -> CellId {
        let mut style = CellStyle::vertex_default();
        style.image = image_reference(detection.thumbnail());
        let name = detection.name().to_owned();
        self.cells.update(|c| c.add_vertex(name, geometry, style))
    }

    fn create_staged_detection_cell(&mut self, graph: &TrackGraph, id: DetectionId) {
        let Some(detection) = graph.detection(id) else {
            return;
        };
        if self.ids.cell_of_detection(id).is_some() {
            return;
        }
        let geometry = self.staged_geometry(detection);
        let cell = self.spawn_vertex_cell(detection, geometry);
        self.ids.insert_detection(id, cell);
    }

    fn create_placed_detection_cell(&mut self, graph: &TrackGraph, id: DetectionId) {
        let Some(detection) = graph.detection(id) else {
            return;
        };
        if self.ids.cell_of_detection(id).is_some() {
            return;
        }
        let geometry = match self.layout.cell_geometry(id, detection.radius()) {
            Some((x, y, width, height)) => Geometry::new(x, y, width, height),
            None => self.staged_geometry(detection),
        };
        let cell = self.spawn_vertex_cell(detection, geometry);
        self.ids.insert_detection(id, cell);
    }

    /// Refresh image reference and height of a modified detection's cell.
    /// Position is untouched. Uncelled detections are skipped.
    fn update_detection_cell(&mut self, graph: &TrackGraph, id: DetectionId) {
        let Some(detection) = graph.detection(id) else {
            tracing::debug!(detection = %id, "modified detection is not live; skipping");
            return;
        };
        let Some(cell) = self.ids.cell_of_detection(id) else {
            tracing::debug!(detection = %id, "modified detection has no cell; skipping");
            return;
        };
        let Some(current) = self.cells.cell(cell) else {
            return;
        };
        let mut style = current.style().clone();
        style.image = image_reference(detection.thumbnail());
        let mut geometry = current.geometry();
        geometry.height = clamped_cell_height(detection.radius(), self.config.calibration);
        self.cells.update(|c| {
            c.set_style(cell, style);
            c.set_geometry(cell, geometry);
        });
    }

    fn remove_detection_cell(&mut self, id: DetectionId) {
        let Some(cell) = self.ids.remove_detection(id) else {
            return;
        };
        let removed = self.cells.update(|c| c.remove_cells(&[cell], true));
        for dead in removed {
            self.ids.remove_cell(dead);
        }
    }

    fn create_link_cell(&mut self, graph: &TrackGraph, id: LinkId) {
        if self.ids.cell_of_link(id).is_some() {
            return;
        }
        let Some(record) = graph.link(id) else {
            return;
        };
        let (Some(source), Some(target)) = (
            self.ids.cell_of_detection(record.source),
            self.ids.cell_of_detection(record.target),
        ) else {
            tracing::warn!(link = %id, "link endpoints have no cells; dropping edge cell");
            return;
        };
        match self
            .cells
            .update(|c| c.add_edge(source, target, CellStyle::edge_default()))
        {
            Ok(cell) => self.ids.insert_link(id, cell),
            Err(error) => tracing::warn!(link = %id, %error, "edge cell rejected"),
        }
    }

    fn remove_link_cell(&mut self, id: LinkId) {
        let Some(cell) = self.ids.remove_link(id) else {
            return;
        };
        self.cells.update(|c| c.remove_cells(&[cell], false));
    }

    /// Move every celled detection to its layout slot, in one transaction.
    fn apply_layout(&mut self, graph: &TrackGraph) {
        let slots: Vec<DetectionId> = self.layout.slots().iter().map(|&(id, _)| id).collect();
        self.cells.begin_update();
        for id in slots {
            let Some(detection) = graph.detection(id) else {
                continue;
            };
            let Some(cell) = self.ids.cell_of_detection(id) else {
                continue;
            };
            if let Some((x, y, width, height)) = self.layout.cell_geometry(id, detection.radius())
            {
                self.cells.set_geometry(cell, Geometry::new(x, y, width, height));
            }
        }
        self.cells.end_update();
    }
}

// ============================================================================
// SchemeView
// ============================================================================

/// Top-level handle tying the observable graph, the cell mirror, the
/// layout, and the listener registries together.
pub struct SchemeView {
    graph: ObservableTrackGraph,
    mirror: Rc<RefCell<Mirror>>,
    graph_listeners: Vec<(ListenerId, Box<dyn GraphListener>)>,
    selection_listeners: Vec<(ListenerId, Box<dyn SelectionListener>)>,
    /// Semantic selection sets, kept in step with the native selection.
    selected_detections: Vec<DetectionId>,
    selected_links: Vec<LinkId>,
    scroll_target: Option<(f64, f64)>,
    next_listener: u32,
}

impl fmt::Debug for SchemeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeView")
            .field("detections", &self.graph.graph().detection_count())
            .field("links", &self.graph.graph().link_count())
            .field("cells", &self.mirror.borrow().cells.cell_count())
            .finish()
    }
}

impl SchemeView {
    /// Build a view over an existing graph, materializing a cell for every
    /// detection and link up front.
    #[must_use]
    pub fn new(graph: TrackGraph, config: SchemeConfig) -> Self {
        let mut graph = ObservableTrackGraph::new(graph);
        let layout = ltrack_layout::compute(graph.graph(), config.calibration);
        let mirror = Rc::new(RefCell::new(Mirror {
            cells: CellGraph::new(),
            ids: IdentityMap::new(),
            layout,
            config,
            muted: false,
        }));
        mirror.borrow_mut().materialize_graph(graph.graph());

        let hook = Rc::clone(&mirror);
        graph.subscribe(Box::new(move |g, event| {
            let mut mirror = hook.borrow_mut();
            if mirror.muted {
                return;
            }
            mirror.apply_graph_event(g, event);
        }));

        Self {
            graph,
            mirror,
            graph_listeners: Vec::new(),
            selection_listeners: Vec::new(),
            selected_detections: Vec::new(),
            selected_links: Vec::new(),
            scroll_target: None,
            next_listener: 0,
        }
    }

    // ------------------------------------------------------------------
    // Graph access
    // ------------------------------------------------------------------

    /// The authoritative track graph.
    #[must_use]
    pub fn track_graph(&self) -> &TrackGraph {
        self.graph.graph()
    }

    /// Mutable access to the observable graph. Mutations made here are
    /// mirrored into cells immediately.
    #[must_use]
    pub fn graph_mut(&mut self) -> &mut ObservableTrackGraph {
        &mut self.graph
    }

    /// Clone the track graph as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrackGraph {
        self.graph.snapshot()
    }

    // ------------------------------------------------------------------
    // Domain → visual (collection stream)
    // ------------------------------------------------------------------

    /// Apply a batched lifecycle notification from the tracking layer.
    ///
    /// Each batch lands in one visual transaction; items that cannot be
    /// resolved are skipped without aborting the rest of the batch.
    /// Returns the handles assigned to `Created` detections.
    pub fn collection_changed(&mut self, event: CollectionEvent) -> Vec<DetectionId> {
        match event {
            CollectionEvent::Created(detections) => {
                if detections.is_empty() {
                    return Vec::new();
                }
                // Adopt into the graph first, with materialization muted so
                // the whole batch lands in one transaction below.
                self.mirror.borrow_mut().muted = true;
                let ids: Vec<DetectionId> = detections
                    .into_iter()
                    .map(|d| self.graph.add_detection(d))
                    .collect();
                self.mirror.borrow_mut().muted = false;

                let target = {
                    let mut mirror = self.mirror.borrow_mut();
                    let mirror = &mut *mirror;
                    mirror.cells.begin_update();
                    for &id in &ids {
                        mirror.create_staged_detection_cell(self.graph.graph(), id);
                    }
                    mirror.cells.end_update();
                    ids.last()
                        .and_then(|&id| mirror.ids.cell_of_detection(id))
                        .and_then(|cell| mirror.cells.cell(cell))
                        .map(|cell| cell.geometry().center())
                };
                if let Some(center) = target {
                    self.scroll_target = Some(center);
                }
                ids
            }
            CollectionEvent::Modified(ids) => {
                let mut mirror = self.mirror.borrow_mut();
                let mirror = &mut *mirror;
                mirror.cells.begin_update();
                for id in ids {
                    mirror.update_detection_cell(self.graph.graph(), id);
                }
                mirror.cells.end_update();
                Vec::new()
            }
            CollectionEvent::Deleted(ids) => {
                // The materialization subscriber removes the cells; the
                // outer bracket folds the whole batch into one change.
                self.mirror.borrow_mut().cells.begin_update();
                for id in ids {
                    self.graph.remove_detection(id);
                }
                self.mirror.borrow_mut().cells.end_update();
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Visual → domain
    // ------------------------------------------------------------------

    /// Remove cells that the user deleted in the view, propagate to the
    /// graph, and notify this view's graph listeners.
    ///
    /// Incident edge-cells cascade with their vertex-cell; synthetic
    /// notifications fire links first, then detections.
    pub fn delete_cells(&mut self, targets: &[CellId]) {
        let (detections, links) = {
            let mut mirror = self.mirror.borrow_mut();
            let mirror = &mut *mirror;
            let removed = mirror.cells.update(|c| c.remove_cells(targets, true));
            let mut detections = Vec::new();
            let mut links = Vec::new();
            for cell in removed {
                if let Some(detection) = mirror.ids.detection_of(cell) {
                    mirror.ids.remove_detection(detection);
                    detections.push(detection);
                } else if let Some(link) = mirror.ids.link_of(cell) {
                    mirror.ids.remove_link(link);
                    links.push(link);
                }
                // Group and other transient cells carry no mapping.
            }
            (detections, links)
        };
        if detections.is_empty() && links.is_empty() {
            return;
        }

        self.mirror.borrow_mut().muted = true;
        for &link in &links {
            self.graph.remove_link(link);
        }
        for &detection in &detections {
            self.graph.remove_detection(detection);
        }
        self.mirror.borrow_mut().muted = false;

        for &link in &links {
            for (_, listener) in &mut self.graph_listeners {
                listener.link_removed(link);
            }
        }
        for &detection in &detections {
            for (_, listener) in &mut self.graph_listeners {
                listener.detection_removed(detection);
            }
        }
    }

    /// Create a domain link from a direct cell-to-cell connection drawn in
    /// the view. Honored only when linking is enabled in the config.
    pub fn connect_cells(&mut self, source: CellId, target: CellId) -> Option<LinkId> {
        if !self.mirror.borrow().config.linking_enabled {
            tracing::debug!("cell linking is disabled; ignoring view link");
            return None;
        }
        let (a, b) = {
            let mirror = self.mirror.borrow();
            match (
                mirror.ids.detection_of(source),
                mirror.ids.detection_of(target),
            ) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    tracing::warn!(%source, %target, "view link endpoints have no domain mapping");
                    return None;
                }
            }
        };

        self.mirror.borrow_mut().muted = true;
        let result = self.graph.add_link(a, b, DEFAULT_LINK_WEIGHT);
        self.mirror.borrow_mut().muted = false;

        match result {
            Ok(link) => {
                {
                    let mut mirror = self.mirror.borrow_mut();
                    let mirror = &mut *mirror;
                    if let Ok(cell) = mirror
                        .cells
                        .update(|c| c.add_edge(source, target, CellStyle::edge_default()))
                    {
                        mirror.ids.insert_link(link, cell);
                    }
                }
                for (_, listener) in &mut self.graph_listeners {
                    listener.link_added(link);
                }
                Some(link)
            }
            Err(error) => {
                tracing::debug!(%error, "rejected view link");
                None
            }
        }
    }

    /// Apply a label edit made on a vertex-cell: rename the detection and
    /// the cell together. With `auto_size`, the cell height is re-derived
    /// from the detection's radius. Unmapped cells are ignored.
    pub fn label_changed(&mut self, cell: CellId, value: &str, auto_size: bool) {
        let detection = self.mirror.borrow().ids.detection_of(cell);
        let Some(detection) = detection else {
            tracing::debug!(%cell, "label edit on unmapped cell ignored");
            return;
        };
        let mut radius = None;
        if let Some(d) = self.graph.detection_mut(detection) {
            d.set_name(value);
            radius = Some(d.radius());
        }
        let mut mirror = self.mirror.borrow_mut();
        let mirror = &mut *mirror;
        let calibration = mirror.config.calibration;
        mirror.cells.update(|cells| {
            cells.set_value(cell, value);
            if auto_size
                && let Some(radius) = radius
                && let Some(current) = cells.cell(cell)
            {
                let mut geometry = current.geometry();
                geometry.height = clamped_cell_height(radius, calibration);
                cells.set_geometry(cell, geometry);
            }
        });
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Apply a native selection change (user click, rubber band). Dead
    /// handles are ignored; one settled notification fires if anything
    /// moved.
    pub fn select_cells(&mut self, add: &[CellId], remove: &[CellId]) {
        let delta = self.mirror.borrow_mut().cells.change_selection(add, remove);
        if let Some(delta) = delta {
            self.native_selection_changed(&delta);
        }
    }

    /// Process a selection delta from the native selection model.
    ///
    /// The delta's nominal field names are inverted (see
    /// [`SelectionDelta`]); this reads them through the disambiguating
    /// accessors, rebuilds the full selection from the live native state,
    /// and fires one combined notification.
    pub fn native_selection_changed(&mut self, delta: &SelectionDelta) {
        let entered = delta.selected().to_vec();
        let left = delta.deselected().to_vec();
        self.publish_selection(entered, left);
    }

    /// Replace the highlighted detections, leaving edge-cell selection
    /// untouched. At most one settled notification fires, after the swap.
    pub fn highlight_detections(&mut self, detections: &[DetectionId]) {
        let wanted: Vec<CellId> = {
            let mirror = self.mirror.borrow();
            detections
                .iter()
                .filter_map(|&d| {
                    let cell = mirror.ids.cell_of_detection(d);
                    if cell.is_none() {
                        tracing::debug!(detection = %d, "no cell for highlight target");
                    }
                    cell
                })
                .collect()
        };
        self.swap_selected_kind(&wanted, true);
    }

    /// Replace the highlighted links, leaving vertex-cell selection
    /// untouched. At most one settled notification fires, after the swap.
    pub fn highlight_links(&mut self, links: &[LinkId]) {
        let wanted: Vec<CellId> = {
            let mirror = self.mirror.borrow();
            links
                .iter()
                .filter_map(|&l| {
                    let cell = mirror.ids.cell_of_link(l);
                    if cell.is_none() {
                        tracing::debug!(link = %l, "no cell for highlight target");
                    }
                    cell
                })
                .collect()
        };
        self.swap_selected_kind(&wanted, false);
    }

    /// Swap the selected cells of one kind with events suppressed, then
    /// settle with at most one notification.
    fn swap_selected_kind(&mut self, wanted: &[CellId], vertex_kind: bool) {
        let (entered, left) = {
            let mut mirror = self.mirror.borrow_mut();
            let mirror = &mut *mirror;
            let before: Vec<CellId> = mirror.cells.selected_cells().to_vec();
            let was_enabled = mirror.cells.set_selection_events(false);
            let of_kind: Vec<CellId> = before
                .iter()
                .copied()
                .filter(|&c| {
                    mirror
                        .cells
                        .cell(c)
                        .is_some_and(|cell| cell.is_vertex() == vertex_kind)
                })
                .collect();
            let _ = mirror.cells.change_selection(&[], &of_kind);
            let _ = mirror.cells.change_selection(wanted, &[]);
            mirror.cells.set_selection_events(was_enabled);
            let after: Vec<CellId> = mirror.cells.selected_cells().to_vec();
            let entered: Vec<CellId> = after
                .iter()
                .copied()
                .filter(|c| !before.contains(c))
                .collect();
            let left: Vec<CellId> = before
                .iter()
                .copied()
                .filter(|c| !after.contains(c))
                .collect();
            (entered, left)
        };
        if !entered.is_empty() || !left.is_empty() {
            self.publish_selection(entered, left);
        }
    }

    fn publish_selection(&mut self, entered: Vec<CellId>, left: Vec<CellId>) {
        let change = {
            let mirror = self.mirror.borrow();
            let mut detection_transitions = FxHashMap::default();
            let mut link_transitions = FxHashMap::default();
            for &cell in &left {
                if let Some(d) = mirror.ids.detection_of(cell) {
                    detection_transitions.insert(d, false);
                } else if let Some(l) = mirror.ids.link_of(cell) {
                    link_transitions.insert(l, false);
                }
            }
            for &cell in &entered {
                if let Some(d) = mirror.ids.detection_of(cell) {
                    detection_transitions.insert(d, true);
                } else if let Some(l) = mirror.ids.link_of(cell) {
                    link_transitions.insert(l, true);
                }
            }
            // Full sets come from the live native selection, not from the
            // delta, so repeated deltas cannot drift.
            let mut detections = Vec::new();
            let mut links = Vec::new();
            for &cell in mirror.cells.selected_cells() {
                if let Some(d) = mirror.ids.detection_of(cell) {
                    detections.push(d);
                } else if let Some(l) = mirror.ids.link_of(cell) {
                    links.push(l);
                }
            }
            SelectionChange {
                detections,
                links,
                detection_transitions,
                link_transitions,
            }
        };
        self.selected_detections = change.detections.clone();
        self.selected_links = change.links.clone();
        for (_, listener) in &mut self.selection_listeners {
            listener.selection_changed(&change);
        }
    }

    /// Currently selected detections (semantic set).
    #[must_use]
    pub fn selected_detections(&self) -> &[DetectionId] {
        &self.selected_detections
    }

    /// Currently selected links (semantic set).
    #[must_use]
    pub fn selected_links(&self) -> &[LinkId] {
        &self.selected_links
    }

    /// Selected detections with group cells resolved to their grouped
    /// children. Order follows the native selection; duplicates collapse.
    #[must_use]
    pub fn harvest_selected_detections(&self) -> Vec<DetectionId> {
        let mirror = self.mirror.borrow();
        let mut out = Vec::new();
        let mut push = |out: &mut Vec<DetectionId>, id: DetectionId| {
            if !out.contains(&id) {
                out.push(id);
            }
        };
        for &cell in mirror.cells.selected_cells() {
            let Some(c) = mirror.cells.cell(cell) else {
                continue;
            };
            if !c.is_vertex() {
                continue;
            }
            if let Some(d) = mirror.ids.detection_of(cell) {
                push(&mut out, d);
            } else {
                for &child in c.children() {
                    if let Some(d) = mirror.ids.detection_of(child) {
                        push(&mut out, d);
                    }
                }
            }
        }
        out
    }

    /// Currently selected cells, in selection order.
    #[must_use]
    pub fn selected_cells(&self) -> Vec<CellId> {
        self.mirror.borrow().cells.selected_cells().to_vec()
    }

    // ------------------------------------------------------------------
    // Layout and navigation
    // ------------------------------------------------------------------

    /// Recompute the layout from the current graph structure and move
    /// every cell to its slot, in one transaction.
    pub fn recompute_layout(&mut self) {
        let calibration = self.mirror.borrow().config.calibration;
        let layout = ltrack_layout::compute(self.graph.graph(), calibration);
        let mut mirror = self.mirror.borrow_mut();
        mirror.layout = layout;
        mirror.apply_layout(self.graph.graph());
    }

    /// Snapshot of the last computed layout.
    #[must_use]
    pub fn layout(&self) -> SchemeLayout {
        self.mirror.borrow().layout.clone()
    }

    /// Aim the viewport at a detection's cell. Returns the cell center.
    pub fn center_on(&mut self, id: DetectionId) -> Option<(f64, f64)> {
        let center = {
            let mirror = self.mirror.borrow();
            let cell = mirror.ids.cell_of_detection(id)?;
            mirror.cells.cell(cell)?.geometry().center()
        };
        self.scroll_target = Some(center);
        Some(center)
    }

    /// Where the viewport was last aimed.
    #[must_use]
    pub const fn scroll_target(&self) -> Option<(f64, f64)> {
        self.scroll_target
    }

    // ------------------------------------------------------------------
    // Cell queries
    // ------------------------------------------------------------------

    /// Cell of a detection.
    #[must_use]
    pub fn cell_of_detection(&self, id: DetectionId) -> Option<CellId> {
        self.mirror.borrow().ids.cell_of_detection(id)
    }

    /// Cell of a link.
    #[must_use]
    pub fn cell_of_link(&self, id: LinkId) -> Option<CellId> {
        self.mirror.borrow().ids.cell_of_link(id)
    }

    /// Detection of a cell.
    #[must_use]
    pub fn detection_of_cell(&self, cell: CellId) -> Option<DetectionId> {
        self.mirror.borrow().ids.detection_of(cell)
    }

    /// Link of a cell.
    #[must_use]
    pub fn link_of_cell(&self, cell: CellId) -> Option<LinkId> {
        self.mirror.borrow().ids.link_of(cell)
    }

    /// Clone a cell for inspection.
    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<Cell> {
        self.mirror.borrow().cells.cell(id).cloned()
    }

    /// Number of live cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.mirror.borrow().cells.cell_count()
    }

    /// Bundle the cells into an untracked group cell.
    pub fn group_cells(&mut self, label: &str, members: &[CellId]) -> CellId {
        let mut mirror = self.mirror.borrow_mut();
        mirror.cells.update(|c| c.group(label, members))
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> SchemeConfig {
        self.mirror.borrow().config
    }

    /// Toggle whether direct cell linking creates domain links.
    pub fn set_linking_enabled(&mut self, enabled: bool) {
        self.mirror.borrow_mut().config.linking_enabled = enabled;
    }

    /// Update the calibration factor. Takes effect on the next layout
    /// pass and cell-size derivation.
    pub fn set_calibration(&mut self, calibration: f64) {
        self.mirror.borrow_mut().config.calibration = calibration;
    }

    // ------------------------------------------------------------------
    // Listener registries
    // ------------------------------------------------------------------

    /// Register an observer of view-origin structural edits.
    pub fn add_graph_listener(&mut self, listener: Box<dyn GraphListener>) -> ListenerId {
        let id = self.next_listener_id();
        self.graph_listeners.push((id, listener));
        id
    }

    /// Remove a graph listener. Idempotent.
    pub fn remove_graph_listener(&mut self, id: ListenerId) -> bool {
        let before = self.graph_listeners.len();
        self.graph_listeners.retain(|(l, _)| *l != id);
        self.graph_listeners.len() != before
    }

    /// Register an observer of settled selection changes.
    pub fn add_selection_listener(&mut self, listener: Box<dyn SelectionListener>) -> ListenerId {
        let id = self.next_listener_id();
        self.selection_listeners.push((id, listener));
        id
    }

    /// Remove a selection listener. Idempotent.
    pub fn remove_selection_listener(&mut self, id: ListenerId) -> bool {
        let before = self.selection_listeners.len();
        self.selection_listeners.retain(|(l, _)| *l != id);
        self.selection_listeners.len() != before
    }

    /// Observe combined cell changes at transaction boundaries. Observers
    /// must not call back into the view.
    pub fn observe_cell_changes(&mut self, observer: Box<dyn FnMut(&CellChange)>) -> ObserverId {
        self.mirror.borrow_mut().cells.observe(observer)
    }

    /// Remove a cell-change observer. Idempotent.
    pub fn unobserve_cell_changes(&mut self, id: ObserverId) -> bool {
        self.mirror.borrow_mut().cells.unobserve(id)
    }

    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    // ------------------------------------------------------------------
    // Invariant checking
    // ------------------------------------------------------------------

    /// Verify the identity-map bijection: every mapped handle is live on
    /// both sides, both table directions agree, and every non-group cell
    /// carries a mapping.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let mirror = self.mirror.borrow();
        let graph = self.graph.graph();
        if !mirror.ids.is_consistent() {
            return Err(ConsistencyError::OneSidedEntry);
        }
        for (detection, cell) in mirror.ids.detections() {
            if !graph.contains(detection) {
                return Err(ConsistencyError::DeadDetection(detection));
            }
            match mirror.cells.cell(cell) {
                None => return Err(ConsistencyError::DeadCell(cell)),
                Some(c) if !c.is_vertex() => return Err(ConsistencyError::KindMismatch(cell)),
                Some(_) => {}
            }
        }
        for (link, cell) in mirror.ids.links() {
            if !graph.contains_link(link) {
                return Err(ConsistencyError::DeadLink(link));
            }
            match mirror.cells.cell(cell) {
                None => return Err(ConsistencyError::DeadCell(cell)),
                Some(c) if !c.is_edge() => return Err(ConsistencyError::KindMismatch(cell)),
                Some(_) => {}
            }
        }
        for cell in mirror.cells.cell_ids() {
            let Some(c) = mirror.cells.cell(cell) else {
                continue;
            };
            let mapped =
                mirror.ids.detection_of(cell).is_some() || mirror.ids.link_of(cell).is_some();
            if mapped {
                continue;
            }
            if c.is_edge() {
                return Err(ConsistencyError::UnmappedEdgeCell(cell));
            }
            if c.children().is_empty() {
                return Err(ConsistencyError::UnmappedVertexCell(cell));
            }
        }
        Ok(())
    }
}
