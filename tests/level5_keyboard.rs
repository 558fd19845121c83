//! Level 5: Keyboard & Content Editing Tests
//!
//! Tests Delete/Backspace/Escape handling, content validation and the
//! deferred edit request posted when a text-capable node is placed.

mod common;

use common::harness::CanvasHarness;
use slint_diagram_canvas::{CanvasError, ConnectionStyle, Key, NewNode, Point, ShapeKind, Tool};

#[test]
fn test_delete_removes_selection_and_connections() {
    let (mut t, c) = CanvasHarness::with_connected_nodes();
    t.h.click(150.0, 150.0);
    t.h.key(Key::Delete);

    let graph = t.h.ctrl.graph();
    assert!(!graph.contains_node(t.a));
    assert!(graph.contains_node(t.b));
    assert!(graph.connection(c).is_none());
    assert!(graph.selection().is_empty());
}

#[test]
fn test_backspace_deletes_multi_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.a, t.b]).unwrap();
    t.h.key(Key::Backspace);
    assert_eq!(t.h.ctrl.graph().node_count(), 0);
}

#[test]
fn test_delete_with_empty_selection_publishes_nothing() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.key(Key::Delete);
    assert_eq!(t.h.ctrl.graph().node_count(), 2);
    assert_eq!(t.h.tracker.count(), 0);
}

#[test]
fn test_delete_ignored_while_dragging() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.press(150.0, 150.0);
    t.h.move_to(160.0, 160.0);
    t.h.key(Key::Delete);
    assert!(t.h.ctrl.graph().contains_node(t.a));
    t.h.release(160.0, 160.0);
}

#[test]
fn test_delete_damages_removed_footprint() {
    let (mut t, c) = CanvasHarness::with_connected_nodes();
    let a_rect = t.h.node_rect(t.a);
    let c_bounds = t.h.ctrl.graph().connection_bounds(c).unwrap();
    t.h.ctrl.set_selection([t.a]).unwrap();
    t.h.settle();

    t.h.key(Key::Delete);
    let damage = t.h.tracker.all_damage();
    assert!(damage.contains(&a_rect));
    assert!(damage.contains(&c_bounds));
}

#[test]
fn test_escape_discards_connection_preview() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_tool(Tool::Connect(ConnectionStyle::Dashed));
    t.h.press(175.0, 150.0);
    t.h.move_to(475.0, 250.0);
    t.h.key(Key::Escape);
    t.h.release(475.0, 250.0);
    assert_eq!(t.h.ctrl.graph().connection_count(), 0);
    assert!(t.h.ctrl.overlay().is_empty());
}

// ============================================================================
// Content
// ============================================================================

#[test]
fn test_update_content_on_text_capable_node() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.update_content(t.a, "Start").unwrap();
    assert_eq!(t.h.ctrl.graph().node(t.a).unwrap().content, "Start");
    assert!(t.h.tracker.scene_changes() >= 1);
}

#[test]
fn test_update_content_on_circle_is_unsupported() {
    let mut h = CanvasHarness::new();
    let id = h.ctrl.place_node(ShapeKind::Circle, Point::new(100.0, 100.0)).unwrap();
    h.settle();

    let err = h.ctrl.update_content(id, "hello").unwrap_err();
    assert_eq!(err, CanvasError::Unsupported { kind: ShapeKind::Circle });
    assert_eq!(h.ctrl.graph().node(id).unwrap().content, "");
    assert_eq!(h.tracker.count(), 0);
}

#[test]
fn test_triangle_rejects_initial_content() {
    let mut h = CanvasHarness::new();
    let err = h
        .ctrl
        .add_node(NewNode::new(ShapeKind::Triangle, Point::new(0.0, 0.0)).with_content("x"))
        .unwrap_err();
    assert!(matches!(err, CanvasError::Unsupported { .. }));
    assert_eq!(h.ctrl.graph().node_count(), 0);
}

#[test]
fn test_content_length_counts_characters() {
    let mut t = CanvasHarness::with_two_nodes();
    let exact: String = "é".repeat(100);
    t.h.ctrl.update_content(t.a, &exact).unwrap();

    let too_long: String = "é".repeat(101);
    let err = t.h.ctrl.update_content(t.a, &too_long).unwrap_err();
    assert_eq!(err, CanvasError::Overflow { len: 101, max: 100 });
    assert_eq!(t.h.ctrl.graph().node(t.a).unwrap().content, exact);
}

#[test]
fn test_update_content_unknown_node() {
    let mut h = CanvasHarness::new();
    let err = h
        .ctrl
        .update_content(slint_diagram_canvas::NodeId(3), "x")
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Deferred edit requests
// ============================================================================

#[test]
fn test_edit_request_waits_for_paint() {
    let mut h = CanvasHarness::new();
    h.ctrl.set_tool(Tool::Place(ShapeKind::Hexagon));
    h.click(400.0, 300.0);

    assert!(h.ctrl.has_pending_edit());
    assert_eq!(h.ctrl.take_edit_request(), None);
    h.paint();

    let edit = h.ctrl.take_edit_request().expect("edit request after paint");
    assert_eq!(edit.kind, ShapeKind::Hexagon);
    h.ctrl.update_content(edit.node, "Prepare").unwrap();
    assert!(!h.ctrl.has_pending_edit());

    let report = h.paint();
    assert!(report.painted);
    assert_eq!(h.frame.texts(), vec!["Prepare"]);
}

#[test]
fn test_edit_request_dropped_when_node_deleted() {
    let mut h = CanvasHarness::new();
    let id = h.ctrl.place_node(ShapeKind::Text, Point::new(200.0, 200.0)).unwrap();
    h.ctrl.remove_node(id).unwrap();
    h.paint();
    assert_eq!(h.ctrl.take_edit_request(), None);
    assert!(!h.ctrl.has_pending_edit());
}

#[test]
fn test_edit_request_can_be_cancelled() {
    let mut h = CanvasHarness::new();
    h.ctrl.place_node(ShapeKind::Pill, Point::new(200.0, 200.0)).unwrap();
    assert!(h.ctrl.cancel_edit_request());
    h.paint();
    assert_eq!(h.ctrl.take_edit_request(), None);
    assert!(!h.ctrl.cancel_edit_request());
}

#[test]
fn test_newer_placement_supersedes_edit_request() {
    let mut h = CanvasHarness::new();
    h.ctrl.place_node(ShapeKind::Rect, Point::new(100.0, 100.0)).unwrap();
    let second = h.ctrl.place_node(ShapeKind::Diamond, Point::new(400.0, 100.0)).unwrap();
    h.paint();
    assert_eq!(h.ctrl.take_edit_request().map(|e| e.node), Some(second));
}
