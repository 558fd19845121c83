//! Test harness driving a [`CanvasController`] the way a host window would.
//!
//! The default scene mirrors a small flowchart: node A at (100, 100) and node
//! B at (400, 200), both 150x100 rectangles. The viewport starts at identity,
//! so screen and scene coordinates coincide until a test pans or zooms.

#![allow(dead_code)]

use super::ChangeTracker;
use slint_diagram_canvas::{
    CanvasController, ConnectionId, ConnectionStyle, FrameRecorder, Key, Modifiers, NewNode,
    NodeId, PaintReport, Point, PointerButton, Rect, ShapeKind, Size,
};

pub struct CanvasHarness {
    pub ctrl: CanvasController,
    pub tracker: ChangeTracker,
    pub frame: FrameRecorder,
}

/// Harness with nodes A and B already placed.
pub struct TwoNodeHarness {
    pub h: CanvasHarness,
    pub a: NodeId,
    pub b: NodeId,
}

impl Default for CanvasHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasHarness {
    /// Empty canvas with the first frame already painted and the tracker
    /// attached, so tests start from a clean dirty region.
    pub fn new() -> Self {
        let mut ctrl = CanvasController::new();
        let tracker = ChangeTracker::new();
        tracker.attach(&mut ctrl);
        let mut harness = Self { ctrl, tracker, frame: FrameRecorder::new() };
        harness.paint();
        harness.tracker.clear();
        harness
    }

    pub fn with_two_nodes() -> TwoNodeHarness {
        let mut h = Self::new();
        let a = h.add_rect(100.0, 100.0, 150.0, 100.0);
        let b = h.add_rect(400.0, 200.0, 150.0, 100.0);
        h.settle();
        TwoNodeHarness { h, a, b }
    }

    pub fn with_connected_nodes() -> (TwoNodeHarness, ConnectionId) {
        let mut t = Self::with_two_nodes();
        let c = t
            .h
            .ctrl
            .add_connection(t.a, t.b, ConnectionStyle::Arrow)
            .expect("connect A -> B");
        t.h.settle();
        (t, c)
    }

    pub fn add_rect(&mut self, x: f32, y: f32, w: f32, h: f32) -> NodeId {
        self.ctrl
            .add_node(NewNode::new(ShapeKind::Rect, Point::new(x, y)).with_size(Size::new(w, h)))
            .expect("add node")
    }

    /// Paint and forget everything recorded so far.
    pub fn settle(&mut self) {
        self.paint();
        self.tracker.clear();
    }

    /// Paint one frame into a fresh recorder.
    pub fn paint(&mut self) -> PaintReport {
        self.frame.clear();
        self.ctrl.paint(&mut self.frame)
    }

    // === Pointer helpers (screen coordinates) ===

    pub fn press(&mut self, x: f32, y: f32) {
        self.ctrl
            .pointer_down(Point::new(x, y), PointerButton::Primary, Modifiers::default());
    }

    pub fn shift_press(&mut self, x: f32, y: f32) {
        self.ctrl
            .pointer_down(Point::new(x, y), PointerButton::Primary, Modifiers::SHIFT);
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.ctrl.pointer_move(Point::new(x, y));
    }

    pub fn release(&mut self, x: f32, y: f32) {
        self.ctrl.pointer_up(Point::new(x, y));
    }

    pub fn click(&mut self, x: f32, y: f32) {
        self.press(x, y);
        self.release(x, y);
    }

    pub fn shift_click(&mut self, x: f32, y: f32) {
        self.shift_press(x, y);
        self.release(x, y);
    }

    /// Press, move in `steps` increments, release.
    pub fn drag(&mut self, from: (f32, f32), to: (f32, f32), steps: usize) {
        self.press(from.0, from.1);
        let steps = steps.max(1);
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            self.move_to(from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
        }
        self.release(to.0, to.1);
    }

    pub fn key(&mut self, key: Key) {
        self.ctrl.key_pressed(key);
    }

    // === Queries ===

    pub fn node_rect(&self, id: NodeId) -> Rect {
        self.ctrl.graph().node(id).expect("node exists").rect()
    }

    pub fn node_position(&self, id: NodeId) -> Point {
        self.ctrl.graph().node(id).expect("node exists").position
    }

    /// Screen-space centre of a node.
    pub fn screen_center(&self, id: NodeId) -> (f32, f32) {
        let c = self.ctrl.viewport().scene_to_screen(self.node_rect(id).center());
        (c.x, c.y)
    }

    pub fn selection(&self) -> Vec<NodeId> {
        self.ctrl.graph().selection().ids().to_vec()
    }
}
