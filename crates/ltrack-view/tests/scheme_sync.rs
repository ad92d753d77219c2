//! End-to-end synchronization behavior of the scheme view: materialization,
//! propagation, echo suppression, selection, and layout application.

use std::cell::RefCell;
use std::rc::Rc;

use ltrack_graph::{Detection, DetectionId, LinkId, TrackGraph};
use ltrack_layout::{CELL_WIDTH, clamped_cell_height};
use ltrack_view::{
    CellChange, CollectionEvent, GraphListener, SchemeConfig, SchemeView, SelectionChange,
    SelectionDelta, SelectionListener,
};

// ----------------------------------------------------------------------
// Recording listeners
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ViewEdit {
    DetectionAdded(DetectionId),
    DetectionRemoved(DetectionId),
    LinkAdded(LinkId),
    LinkRemoved(LinkId),
}

#[derive(Clone, Default)]
struct EditLog(Rc<RefCell<Vec<ViewEdit>>>);

impl GraphListener for EditLog {
    fn detection_added(&mut self, id: DetectionId) {
        self.0.borrow_mut().push(ViewEdit::DetectionAdded(id));
    }
    fn detection_removed(&mut self, id: DetectionId) {
        self.0.borrow_mut().push(ViewEdit::DetectionRemoved(id));
    }
    fn link_added(&mut self, id: LinkId) {
        self.0.borrow_mut().push(ViewEdit::LinkAdded(id));
    }
    fn link_removed(&mut self, id: LinkId) {
        self.0.borrow_mut().push(ViewEdit::LinkRemoved(id));
    }
}

#[derive(Clone, Default)]
struct SelectionLog(Rc<RefCell<Vec<SelectionChange>>>);

impl SelectionListener for SelectionLog {
    fn selection_changed(&mut self, change: &SelectionChange) {
        self.0.borrow_mut().push(change.clone());
    }
}

fn cell_change_log(view: &mut SchemeView) -> Rc<RefCell<Vec<CellChange>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    view.observe_cell_changes(Box::new(move |change| sink.borrow_mut().push(change.clone())));
    log
}

fn edit_log(view: &mut SchemeView) -> Rc<RefCell<Vec<ViewEdit>>> {
    let log = EditLog::default();
    let events = Rc::clone(&log.0);
    view.add_graph_listener(Box::new(log));
    events
}

fn selection_log(view: &mut SchemeView) -> Rc<RefCell<Vec<SelectionChange>>> {
    let log = SelectionLog::default();
    let events = Rc::clone(&log.0);
    view.add_selection_listener(Box::new(log));
    events
}

/// One parent at t0 linked to two children at t1.
fn forked_view() -> (SchemeView, [DetectionId; 3], [LinkId; 2]) {
    let mut graph = TrackGraph::new();
    let a = graph.add_detection(Detection::new("a", 0.0, 5.0).with_thumbnail(vec![1]));
    let b = graph.add_detection(Detection::new("b", 1.0, 5.0).with_thumbnail(vec![2]));
    let c = graph.add_detection(Detection::new("c", 1.0, 5.0).with_thumbnail(vec![3]));
    let ab = graph.add_link(a, b, 1.0).unwrap();
    let ac = graph.add_link(a, c, 1.0).unwrap();
    let view = SchemeView::new(graph, SchemeConfig::default());
    (view, [a, b, c], [ab, ac])
}

// ----------------------------------------------------------------------
// Materialization
// ----------------------------------------------------------------------

#[test]
fn construction_materializes_the_whole_graph() {
    let (view, [a, b, c], [ab, ac]) = forked_view();
    assert_eq!(view.cell_count(), 5);
    for id in [a, b, c] {
        let cell = view.cell(view.cell_of_detection(id).unwrap()).unwrap();
        assert!(cell.is_vertex());
        assert!(cell.style().image.as_deref().unwrap().starts_with("data:image/base64,"));
    }
    for link in [ab, ac] {
        assert!(view.cell(view.cell_of_link(link).unwrap()).unwrap().is_edge());
    }
    view.check_consistency().unwrap();
}

#[test]
fn created_batch_is_one_transaction_with_no_propagation_echo() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    let changes = cell_change_log(&mut view);
    let edits = edit_log(&mut view);

    let ids = view.collection_changed(CollectionEvent::Created(vec![
        Detection::new("a", 0.0, 5.0),
        Detection::new("b", 1.0, 5.0),
        Detection::new("c", 2.0, 5.0),
    ]));

    assert_eq!(ids.len(), 3);
    let changes = changes.borrow();
    assert_eq!(changes.len(), 1, "batch must land as one combined change");
    assert_eq!(changes[0].added.len(), 3);
    assert!(edits.borrow().is_empty(), "domain-origin edits must not echo");
    view.check_consistency().unwrap();
}

#[test]
fn created_batch_centers_on_the_last_cell() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    let ids = view.collection_changed(CollectionEvent::Created(vec![
        Detection::new("a", 0.0, 5.0),
        Detection::new("b", 1.0, 5.0),
    ]));
    let last = view.cell(view.cell_of_detection(ids[1]).unwrap()).unwrap();
    assert_eq!(view.scroll_target(), Some(last.geometry().center()));
}

#[test]
fn new_cell_heights_clamp_between_floor_and_cell_width() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    let ids = view.collection_changed(CollectionEvent::Created(vec![
        Detection::new("big", 0.0, 100.0), // raw height 200
        Detection::new("tiny", 0.0, 2.0),  // raw height 4
    ]));
    let big = view.cell(view.cell_of_detection(ids[0]).unwrap()).unwrap();
    let tiny = view.cell(view.cell_of_detection(ids[1]).unwrap()).unwrap();
    assert_eq!(big.geometry().height, 128.0);
    assert_eq!(big.geometry().width, CELL_WIDTH);
    assert_eq!(tiny.geometry().height, 12.0);
}

#[test]
fn modification_updates_image_and_height_but_not_position() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    let ids = view.collection_changed(CollectionEvent::Created(vec![
        Detection::new("a", 0.0, 30.0).with_thumbnail(vec![1]),
    ]));
    let id = ids[0];
    let before = view.cell(view.cell_of_detection(id).unwrap()).unwrap();

    if let Some(det) = view.graph_mut().detection_mut(id) {
        det.set_radius(100.0);
        det.set_thumbnail(vec![9]);
    }
    // An id that never existed must not abort the rest of the batch.
    view.collection_changed(CollectionEvent::Modified(vec![
        DetectionId::from_raw(77),
        id,
    ]));

    let after = view.cell(view.cell_of_detection(id).unwrap()).unwrap();
    assert_eq!(after.geometry().x, before.geometry().x);
    assert_eq!(after.geometry().y, before.geometry().y);
    assert_eq!(after.geometry().height, 128.0);
    assert_ne!(after.style().image, before.style().image);
    view.check_consistency().unwrap();
}

#[test]
fn deleted_batch_is_one_transaction_without_listener_echo() {
    let (mut view, [a, b, _c], _) = forked_view();
    let changes = cell_change_log(&mut view);
    let edits = edit_log(&mut view);

    view.collection_changed(CollectionEvent::Deleted(vec![a, b]));

    let changes = changes.borrow();
    assert_eq!(changes.len(), 1);
    // a's vertex cell, b's vertex cell, and both incident edge cells.
    assert_eq!(changes[0].removed.len(), 4);
    assert!(edits.borrow().is_empty());
    assert!(!view.track_graph().contains(a));
    view.check_consistency().unwrap();
}

#[test]
fn direct_graph_mutations_are_mirrored() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    let a = view.graph_mut().add_detection(Detection::new("a", 0.0, 5.0));
    let b = view.graph_mut().add_detection(Detection::new("b", 1.0, 5.0));
    assert_eq!(view.cell_count(), 2);

    let link = view.graph_mut().add_link(a, b, 1.0).unwrap();
    assert!(view.cell_of_link(link).is_some());
    view.check_consistency().unwrap();

    view.graph_mut().remove_link(link);
    assert!(view.cell_of_link(link).is_none());

    view.graph_mut().remove_detection(a);
    assert!(view.cell_of_detection(a).is_none());
    assert_eq!(view.cell_count(), 1);
    view.check_consistency().unwrap();
}

// ----------------------------------------------------------------------
// Visual → domain propagation
// ----------------------------------------------------------------------

#[test]
fn deleting_a_vertex_cell_cascades_links_before_the_detection() {
    let (mut view, [a, _b, _c], [ab, ac]) = forked_view();
    let edits = edit_log(&mut view);

    view.delete_cells(&[view.cell_of_detection(a).unwrap()]);

    assert_eq!(
        *edits.borrow(),
        vec![
            ViewEdit::LinkRemoved(ab),
            ViewEdit::LinkRemoved(ac),
            ViewEdit::DetectionRemoved(a),
        ]
    );
    assert!(!view.track_graph().contains(a));
    assert_eq!(view.track_graph().link_count(), 0);
    assert_eq!(view.cell_count(), 2);
    view.check_consistency().unwrap();
}

#[test]
fn deleting_an_edge_cell_unlinks_the_detections() {
    let (mut view, [a, b, _c], [ab, _ac]) = forked_view();
    let edits = edit_log(&mut view);

    view.delete_cells(&[view.cell_of_link(ab).unwrap()]);

    assert_eq!(*edits.borrow(), vec![ViewEdit::LinkRemoved(ab)]);
    assert!(view.track_graph().contains(a));
    assert!(view.track_graph().contains(b));
    assert_eq!(view.track_graph().link_between(a, b), None);
    view.check_consistency().unwrap();
}

#[test]
fn deleting_dead_or_no_cells_touches_nothing() {
    let (mut view, [a, _b, _c], _) = forked_view();
    let cell = view.cell_of_detection(a).unwrap();
    view.delete_cells(&[cell]);
    let edits = edit_log(&mut view);
    view.delete_cells(&[]);
    view.delete_cells(&[cell]); // already gone
    assert!(edits.borrow().is_empty());
    view.check_consistency().unwrap();
}

#[test]
fn label_edit_renames_detection_and_cell_together() {
    let (mut view, [a, _b, _c], _) = forked_view();
    let cell = view.cell_of_detection(a).unwrap();

    view.label_changed(cell, "anaphase", false);
    assert_eq!(view.track_graph().detection(a).unwrap().name(), "anaphase");
    assert_eq!(view.cell(cell).unwrap().value(), "anaphase");

    // Auto-size re-derives the height from the radius.
    let before = view.cell(cell).unwrap().geometry();
    view.label_changed(cell, "anaphase II", true);
    let after = view.cell(cell).unwrap().geometry();
    assert_eq!(
        after.height,
        clamped_cell_height(view.track_graph().detection(a).unwrap().radius(), 1.0)
    );
    assert_eq!(after.x, before.x);
    view.check_consistency().unwrap();
}

#[test]
fn label_edit_on_unmapped_cell_is_ignored() {
    let (mut view, [a, b, _c], _) = forked_view();
    let group = view.group_cells(
        "pair",
        &[
            view.cell_of_detection(a).unwrap(),
            view.cell_of_detection(b).unwrap(),
        ],
    );
    view.label_changed(group, "nope", true);
    assert_eq!(view.cell(group).unwrap().value(), "pair");
    assert_eq!(view.track_graph().detection(a).unwrap().name(), "a");
}

#[test]
fn connect_cells_honors_the_linking_flag() {
    let mut graph = TrackGraph::new();
    let a = graph.add_detection(Detection::new("a", 0.0, 5.0));
    let b = graph.add_detection(Detection::new("b", 1.0, 5.0));
    let mut view = SchemeView::new(graph, SchemeConfig::default());
    let edits = edit_log(&mut view);
    let (cell_a, cell_b) = (
        view.cell_of_detection(a).unwrap(),
        view.cell_of_detection(b).unwrap(),
    );

    assert_eq!(view.connect_cells(cell_a, cell_b), None);
    assert_eq!(view.track_graph().link_count(), 0);

    view.set_linking_enabled(true);
    let link = view.connect_cells(cell_a, cell_b).unwrap();
    assert_eq!(view.track_graph().link_between(a, b), Some(link));
    assert!(view.cell_of_link(link).is_some());
    assert_eq!(*edits.borrow(), vec![ViewEdit::LinkAdded(link)]);

    // A parallel link is rejected quietly.
    assert_eq!(view.connect_cells(cell_a, cell_b), None);
    assert_eq!(edits.borrow().len(), 1);
    view.check_consistency().unwrap();
}

// ----------------------------------------------------------------------
// Selection synchronization
// ----------------------------------------------------------------------

#[test]
fn highlight_round_trip_settles_in_one_event() {
    let (mut view, [a, b, _c], _) = forked_view();
    let changes = selection_log(&mut view);

    view.highlight_detections(&[a, b]);

    let resolved: Vec<DetectionId> = view
        .selected_cells()
        .into_iter()
        .filter_map(|c| view.detection_of_cell(c))
        .collect();
    assert_eq!(resolved, vec![a, b]);

    let log = changes.borrow();
    assert_eq!(log.len(), 1, "the swap must settle as one event");
    assert_eq!(log[0].detections, vec![a, b]);
    assert_eq!(log[0].detection_transitions.get(&a), Some(&true));
    assert_eq!(log[0].detection_transitions.get(&b), Some(&true));
    drop(log);

    // Re-highlighting the same set is a no-op: zero further events.
    view.highlight_detections(&[a, b]);
    assert_eq!(changes.borrow().len(), 1);
}

#[test]
fn highlight_detections_replaces_only_vertex_selection() {
    let (mut view, [a, b, _c], [ab, _ac]) = forked_view();
    let edge_cell = view.cell_of_link(ab).unwrap();
    view.select_cells(&[edge_cell], &[]);

    view.highlight_detections(&[b]);
    let selected = view.selected_cells();
    assert!(selected.contains(&edge_cell), "edge selection must survive");
    assert_eq!(view.selected_detections(), &[b]);
    assert_eq!(view.selected_links(), &[ab]);

    // And the mirror-image direction.
    view.highlight_links(&[]);
    assert_eq!(view.selected_links(), &[] as &[LinkId]);
    assert_eq!(view.selected_detections(), &[b]);
    let _ = a;
}

#[test]
fn unmapped_highlight_targets_are_skipped() {
    let (mut view, [a, _b, _c], _) = forked_view();
    let changes = selection_log(&mut view);
    view.highlight_detections(&[a, DetectionId::from_raw(99)]);
    let log = changes.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].detections, vec![a]);
}

#[test]
fn native_delta_naming_stays_inverted() {
    let (mut view, [a, b, _c], _) = forked_view();
    let cell_a = view.cell_of_detection(a).unwrap();
    let cell_b = view.cell_of_detection(b).unwrap();
    let changes = selection_log(&mut view);

    // The nominal "added" list carries the cell that ceased to be
    // selected; "removed" carries the newly selected one.
    view.native_selection_changed(&SelectionDelta {
        added: vec![cell_a],
        removed: vec![cell_b],
    });

    let log = changes.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].detection_transitions.get(&a), Some(&false));
    assert_eq!(log[0].detection_transitions.get(&b), Some(&true));
}

#[test]
fn select_cells_rebuilds_the_full_set_from_live_selection() {
    let (mut view, [a, b, _c], _) = forked_view();
    let cell_a = view.cell_of_detection(a).unwrap();
    let cell_b = view.cell_of_detection(b).unwrap();
    let changes = selection_log(&mut view);

    view.select_cells(&[cell_a], &[]);
    view.select_cells(&[cell_b], &[cell_a]);

    let log = changes.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].detections, vec![b]);
    assert_eq!(log[1].detection_transitions.get(&a), Some(&false));
    assert_eq!(log[1].detection_transitions.get(&b), Some(&true));
    assert_eq!(view.selected_detections(), &[b]);
}

#[test]
fn harvest_resolves_group_children() {
    let (mut view, [a, b, c], _) = forked_view();
    let group = view.group_cells(
        "pair",
        &[
            view.cell_of_detection(a).unwrap(),
            view.cell_of_detection(b).unwrap(),
        ],
    );
    view.select_cells(&[group, view.cell_of_detection(c).unwrap()], &[]);
    assert_eq!(view.harvest_selected_detections(), vec![a, b, c]);
    // The semantic set only carries mapped cells.
    assert_eq!(view.selected_detections(), &[c]);
}

// ----------------------------------------------------------------------
// Layout and navigation
// ----------------------------------------------------------------------

#[test]
fn recompute_layout_moves_cells_to_their_slots() {
    let (mut view, [a, b, c], _) = forked_view();
    view.recompute_layout();
    let layout = view.layout();
    for id in [a, b, c] {
        let radius = view.track_graph().detection(id).unwrap().radius();
        let (x, y, w, h) = layout.cell_geometry(id, radius).unwrap();
        let geometry = view.cell(view.cell_of_detection(id).unwrap()).unwrap().geometry();
        assert_eq!((geometry.x, geometry.y), (x, y));
        assert_eq!((geometry.width, geometry.height), (w, h));
    }
}

#[test]
fn staged_cells_fall_into_the_grid_after_a_layout_pass() {
    let mut view = SchemeView::new(TrackGraph::new(), SchemeConfig::default());
    // Unknown instant at creation time: staged below the known rows.
    let ids = view.collection_changed(CollectionEvent::Created(vec![Detection::new(
        "a", 4.0, 5.0,
    )]));
    view.recompute_layout();
    let layout = view.layout();
    assert_eq!(layout.slot_of(ids[0]).map(|s| s.row), Some(0));
    let geometry = view.cell(view.cell_of_detection(ids[0]).unwrap()).unwrap().geometry();
    assert_eq!((geometry.x, geometry.y), layout.slot_of(ids[0]).unwrap().origin());
}

#[test]
fn center_on_aims_at_the_cell_center() {
    let (mut view, [a, _b, _c], _) = forked_view();
    let expected = view
        .cell(view.cell_of_detection(a).unwrap())
        .unwrap()
        .geometry()
        .center();
    assert_eq!(view.center_on(a), Some(expected));
    assert_eq!(view.scroll_target(), Some(expected));
    assert_eq!(view.center_on(DetectionId::from_raw(99)), None);
}

#[test]
fn layout_passes_are_deterministic_through_the_view() {
    let (mut view, _, _) = forked_view();
    view.recompute_layout();
    let first = view.layout();
    view.recompute_layout();
    assert_eq!(first, view.layout());
}

// ----------------------------------------------------------------------
// Listener lifecycle
// ----------------------------------------------------------------------

#[test]
fn listener_removal_is_idempotent() {
    let (mut view, [a, _b, _c], _) = forked_view();
    let log = EditLog::default();
    let events = Rc::clone(&log.0);
    let id = view.add_graph_listener(Box::new(log));
    assert!(view.remove_graph_listener(id));
    assert!(!view.remove_graph_listener(id));

    view.delete_cells(&[view.cell_of_detection(a).unwrap()]);
    assert!(events.borrow().is_empty());
}
