#![forbid(unsafe_code)]

//! Visual cell arena with transactional change notification.
//!
//! # Design
//!
//! Cells live in a slot arena with free-list reuse, like the domain arena.
//! Mutations accumulate into one [`CellChange`] while an update transaction
//! is open; transactions nest as a reentrant counter, and only the
//! outermost `end_update` flushes the combined change to observers. A
//! mutation outside any transaction brackets itself, so every mutation is
//! observed exactly once either way.
//!
//! Removal order is fixed: grouped children go before their group, and
//! incident edge-cells go before their endpoint vertex-cell.
//!
//! Observers must not call back into the graph; they receive the combined
//! change and return.

use std::fmt;

use crate::cell::{Cell, CellId, CellKind, CellStyle, Geometry};
use crate::selection::{SelectionDelta, SelectionModel};

// ============================================================================
// Change notification
// ============================================================================

/// Combined cell mutations flushed at a transaction boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellChange {
    pub added: Vec<CellId>,
    pub removed: Vec<CellId>,
    pub updated: Vec<CellId>,
}

impl CellChange {
    /// Whether the change carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

/// Handle for removing a cell-change observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Error for malformed edge-cell insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellGraphError {
    /// The referenced endpoint cell is not live.
    MissingEndpoint(CellId),
    /// The referenced endpoint cell is not a vertex-cell.
    NotAVertex(CellId),
}

impl fmt::Display for CellGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEndpoint(id) => write!(f, "edge endpoint {id} is not live"),
            Self::NotAVertex(id) => write!(f, "edge endpoint {id} is not a vertex cell"),
        }
    }
}

impl std::error::Error for CellGraphError {}

// ============================================================================
// CellGraph
// ============================================================================

type Observer = Box<dyn FnMut(&CellChange)>;

/// Arena of visual cells plus the native selection model.
pub struct CellGraph {
    cells: Vec<Option<Cell>>,
    free: Vec<u32>,
    depth: u32,
    pending: CellChange,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u32,
    selection: SelectionModel,
}

impl fmt::Debug for CellGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellGraph")
            .field("cells", &self.cell_count())
            .field("depth", &self.depth)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for CellGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CellGraph {
    /// Create an empty cell graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            free: Vec::new(),
            depth: 0,
            pending: CellChange::default(),
            observers: Vec::new(),
            next_observer: 0,
            selection: SelectionModel::new(),
        }
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Open an update transaction. Nested opens collapse into the
    /// outermost bracket.
    pub fn begin_update(&mut self) {
        self.depth += 1;
    }

    /// Close an update transaction; the outermost close flushes the
    /// combined change. An unbalanced close is a programming error
    /// (asserted in debug builds) and clamps in release.
    pub fn end_update(&mut self) {
        if self.depth == 0 {
            debug_assert!(false, "end_update without begin_update");
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.flush();
        }
    }

    /// Run `f` inside one update bracket.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    /// Whether a transaction is currently open.
    #[must_use]
    pub const fn in_update(&self) -> bool {
        self.depth > 0
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let change = std::mem::take(&mut self.pending);
        for (_, observer) in &mut self.observers {
            observer(&change);
        }
    }

    /// Register a change observer.
    pub fn observe(&mut self, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove a change observer. Idempotent.
    pub fn unobserve(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(o, _)| *o != id);
        self.observers.len() != before
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Insert a vertex-cell.
    pub fn add_vertex(
        &mut self,
        value: impl Into<String>,
        geometry: Geometry,
        style: CellStyle,
    ) -> CellId {
        let cell = Cell {
            value: value.into(),
            geometry,
            style,
            kind: CellKind::Vertex { edges: Vec::new() },
            parent: None,
            children: Vec::new(),
        };
        let id = self.insert(cell);
        self.record(|p| p.added.push(id));
        id
    }

    /// Insert an edge-cell between two live vertex-cells.
    pub fn add_edge(
        &mut self,
        source: CellId,
        target: CellId,
        style: CellStyle,
    ) -> Result<CellId, CellGraphError> {
        for endpoint in [source, target] {
            match self.cell(endpoint) {
                None => return Err(CellGraphError::MissingEndpoint(endpoint)),
                Some(cell) if !cell.is_vertex() => {
                    return Err(CellGraphError::NotAVertex(endpoint));
                }
                Some(_) => {}
            }
        }
        let cell = Cell {
            value: String::new(),
            geometry: Geometry::default(),
            style,
            kind: CellKind::Edge { source, target },
            parent: None,
            children: Vec::new(),
        };
        let id = self.insert(cell);
        for endpoint in [source, target] {
            if let Some(Cell {
                kind: CellKind::Vertex { edges },
                ..
            }) = self.cell_mut(endpoint)
            {
                edges.push(id);
            }
        }
        self.record(|p| p.added.push(id));
        Ok(id)
    }

    /// Bundle live vertex-cells into a group cell sized to their union.
    ///
    /// Group cells carry no identity mapping; they are display affordances.
    pub fn group(&mut self, value: impl Into<String>, members: &[CellId]) -> CellId {
        let kept: Vec<CellId> = members
            .iter()
            .copied()
            .filter(|&m| self.cell(m).is_some_and(Cell::is_vertex))
            .collect();
        let bounds = kept
            .iter()
            .filter_map(|&m| self.cell(m).map(Cell::geometry))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let group = Cell {
            value: value.into(),
            geometry: bounds,
            style: CellStyle::vertex_default(),
            kind: CellKind::Vertex { edges: Vec::new() },
            parent: None,
            children: kept.clone(),
        };
        let id = self.insert(group);
        for member in kept {
            if let Some(cell) = self.cell_mut(member) {
                cell.parent = Some(id);
            }
        }
        self.record(|p| p.added.push(id));
        id
    }

    /// Remove cells, cascading grouped children and (when `include_edges`)
    /// incident edge-cells. Children and edges are removed before the cell
    /// that owns them. Returns every removed cell in removal order.
    pub fn remove_cells(&mut self, targets: &[CellId], include_edges: bool) -> Vec<CellId> {
        let mut order = Vec::new();
        let mut seen = Vec::new();
        for &target in targets {
            self.collect_removal(target, include_edges, &mut order, &mut seen);
        }
        for &id in &order {
            self.detach(id);
        }
        self.selection.prune(&order);
        if !order.is_empty() {
            let removed = order.clone();
            self.record(move |p| p.removed.extend(removed));
        }
        order
    }

    fn collect_removal(
        &self,
        id: CellId,
        include_edges: bool,
        order: &mut Vec<CellId>,
        seen: &mut Vec<CellId>,
    ) {
        if seen.contains(&id) {
            return;
        }
        let Some(cell) = self.cell(id) else {
            return;
        };
        seen.push(id);
        match &cell.kind {
            CellKind::Vertex { edges } => {
                for &child in &cell.children {
                    self.collect_removal(child, include_edges, order, seen);
                }
                if include_edges {
                    for &edge in edges {
                        if !seen.contains(&edge) && self.cell(edge).is_some() {
                            seen.push(edge);
                            order.push(edge);
                        }
                    }
                }
                order.push(id);
            }
            CellKind::Edge { .. } => order.push(id),
        }
    }

    fn detach(&mut self, id: CellId) {
        let Some(cell) = self.cells.get_mut(id.raw() as usize).and_then(Option::take) else {
            return;
        };
        self.free.push(id.raw());
        // Unhook from endpoints, parent, and children.
        if let CellKind::Edge { source, target } = cell.kind {
            for endpoint in [source, target] {
                if let Some(Cell {
                    kind: CellKind::Vertex { edges },
                    ..
                }) = self.cell_mut(endpoint)
                {
                    edges.retain(|&e| e != id);
                }
            }
        }
        if let Some(parent) = cell.parent
            && let Some(parent_cell) = self.cell_mut(parent)
        {
            parent_cell.children.retain(|&c| c != id);
        }
        for child in cell.children {
            if let Some(child_cell) = self.cell_mut(child) {
                child_cell.parent = None;
            }
        }
    }

    /// Reposition a vertex-cell.
    pub fn set_geometry(&mut self, id: CellId, geometry: Geometry) -> bool {
        match self.cell_mut(id) {
            Some(cell) => {
                cell.geometry = geometry;
                self.record(|p| p.updated.push(id));
                true
            }
            None => false,
        }
    }

    /// Restyle a cell.
    pub fn set_style(&mut self, id: CellId, style: CellStyle) -> bool {
        match self.cell_mut(id) {
            Some(cell) => {
                cell.style = style;
                self.record(|p| p.updated.push(id));
                true
            }
            None => false,
        }
    }

    /// Relabel a cell.
    pub fn set_value(&mut self, id: CellId, value: impl Into<String>) -> bool {
        match self.cell_mut(id) {
            Some(cell) => {
                cell.value = value.into();
                self.record(|p| p.updated.push(id));
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Borrow a cell.
    #[must_use]
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.raw() as usize)?.as_ref()
    }

    fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id.raw() as usize)?.as_mut()
    }

    /// Live cell handles in ascending order.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| CellId::from_raw(i as u32))
    }

    /// Number of live cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len() - self.free.len()
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Currently selected cells, in selection order.
    #[must_use]
    pub fn selected_cells(&self) -> &[CellId] {
        self.selection.cells()
    }

    /// Apply a selection change; dead handles are ignored. Returns the
    /// (inverted-naming) delta when events are enabled and anything moved.
    pub fn change_selection(
        &mut self,
        add: &[CellId],
        remove: &[CellId],
    ) -> Option<SelectionDelta> {
        let add: Vec<CellId> = add
            .iter()
            .copied()
            .filter(|&c| self.cell(c).is_some())
            .collect();
        self.selection.change(&add, remove)
    }

    /// Toggle selection event emission, returning the previous state.
    pub fn set_selection_events(&mut self, enabled: bool) -> bool {
        self.selection.set_events_enabled(enabled)
    }

    fn record(&mut self, f: impl FnOnce(&mut CellChange)) {
        if self.depth > 0 {
            f(&mut self.pending);
        } else {
            self.begin_update();
            f(&mut self.pending);
            self.end_update();
        }
    }

    fn insert(&mut self, cell: Cell) -> CellId {
        if let Some(slot) = self.free.pop() {
            self.cells[slot as usize] = Some(cell);
            CellId::from_raw(slot)
        } else {
            let id = self.cells.len() as u32;
            self.cells.push(Some(cell));
            CellId::from_raw(id)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
