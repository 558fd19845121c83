//! Level 4: Selection Tests
//!
//! Tests marquee selection, shift-click toggling, atomic selection updates,
//! selection damage and syncing the selection to a Slint model.

mod common;

use common::harness::CanvasHarness;
use slint::{Model, VecModel};
use slint_diagram_canvas::{CanvasError, Key, NodeId, Rect};

#[test]
fn test_marquee_selects_intersecting_nodes() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.drag((50.0, 50.0), (300.0, 300.0), 3);
    assert_eq!(t.h.selection(), vec![t.a]);
}

#[test]
fn test_marquee_selects_in_paint_order() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.drag((600.0, 400.0), (50.0, 50.0), 2);
    assert_eq!(t.h.selection(), vec![t.a, t.b]);
}

#[test]
fn test_marquee_touching_edge_does_not_select() {
    let mut t = CanvasHarness::with_two_nodes();
    // Ends exactly on A's left edge
    t.h.drag((20.0, 120.0), (100.0, 180.0), 1);
    assert!(t.h.selection().is_empty());
}

#[test]
fn test_marquee_overlay_visible_while_dragging() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.press(50.0, 50.0);
    t.h.move_to(300.0, 260.0);

    assert_eq!(t.h.ctrl.overlay().marquee, Some(Rect::new(50.0, 50.0, 250.0, 210.0)));
    // Selection is only applied on release
    assert!(t.h.selection().is_empty());
    let dirty = t.h.ctrl.dirty_region().unwrap();
    assert!(dirty.contains_rect(&Rect::new(50.0, 50.0, 250.0, 210.0)));

    t.h.release(300.0, 260.0);
    assert!(t.h.ctrl.overlay().marquee.is_none());
    assert_eq!(t.h.selection(), vec![t.a]);
}

#[test]
fn test_shrinking_marquee_damages_old_bounds() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.press(10.0, 10.0);
    t.h.move_to(390.0, 90.0);
    t.h.settle();

    t.h.move_to(60.0, 60.0);
    let damage = t.h.tracker.all_damage();
    assert!(damage.contains(&Rect::new(10.0, 10.0, 380.0, 80.0)));
    assert!(damage.contains(&Rect::new(10.0, 10.0, 50.0, 50.0)));
    t.h.ctrl.pointer_cancel();
}

#[test]
fn test_click_on_empty_space_clears_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.click(150.0, 150.0);
    t.h.click(700.0, 50.0);
    assert!(t.h.selection().is_empty());
}

#[test]
fn test_shift_marquee_extends_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.click(150.0, 150.0);
    t.h.shift_press(350.0, 150.0);
    t.h.move_to(600.0, 400.0);
    t.h.release(600.0, 400.0);
    assert_eq!(t.h.selection(), vec![t.a, t.b]);
}

#[test]
fn test_shift_click_toggles() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.click(150.0, 150.0);
    t.h.shift_click(450.0, 250.0);
    assert_eq!(t.h.selection(), vec![t.a, t.b]);

    t.h.shift_click(150.0, 150.0);
    assert_eq!(t.h.selection(), vec![t.b]);
    assert!(!t.h.ctrl.is_gesture_active());
}

#[test]
fn test_escape_clears_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.a, t.b]).unwrap();
    t.h.key(Key::Escape);
    assert!(t.h.selection().is_empty());
}

#[test]
fn test_escape_during_marquee_keeps_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.click(450.0, 250.0);
    t.h.shift_press(50.0, 50.0);
    t.h.move_to(300.0, 300.0);
    t.h.key(Key::Escape);
    assert!(t.h.ctrl.overlay().marquee.is_none());
    assert_eq!(t.h.selection(), vec![t.b]);

    // the release after a cancelled gesture does nothing
    t.h.release(300.0, 300.0);
    assert_eq!(t.h.selection(), vec![t.b]);
}

#[test]
fn test_set_selection_is_atomic() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.a]).unwrap();
    t.h.tracker.clear();

    let err = t.h.ctrl.set_selection([t.b, NodeId(42)]).unwrap_err();
    assert_eq!(err, CanvasError::NodeNotFound(NodeId(42)));
    assert_eq!(t.h.selection(), vec![t.a]);
    assert_eq!(t.h.tracker.selection_changes(), 0);
}

#[test]
fn test_selection_change_damages_old_and_new_nodes() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.a]).unwrap();
    t.h.settle();

    t.h.ctrl.set_selection([t.b]).unwrap();
    let batch = t.h.tracker.last().unwrap();
    assert!(batch.selection);
    assert!(batch.damage.contains(&t.h.node_rect(t.a)));
    assert!(batch.damage.contains(&t.h.node_rect(t.b)));
}

#[test]
fn test_selection_sync_to_model() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.b, t.a]).unwrap();

    let model = VecModel::<i32>::default();
    t.h.ctrl.sync_selection_to(&model);
    assert_eq!(model.row_count(), 2);
    assert_eq!(model.row_data(0), Some(t.b.0));
    assert_eq!(model.row_data(1), Some(t.a.0));
}

#[test]
fn test_removed_node_leaves_selection() {
    let mut t = CanvasHarness::with_two_nodes();
    t.h.ctrl.set_selection([t.a, t.b]).unwrap();
    t.h.ctrl.remove_node(t.a).unwrap();
    assert_eq!(t.h.selection(), vec![t.b]);
}
