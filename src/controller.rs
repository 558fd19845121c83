//! High-level controller for diagram canvas applications.
//!
//! The [`CanvasController`] owns one input cycle at a time: pointer, wheel and
//! key handlers translate gestures into viewport and scene mutations, and
//! every handler ends by publishing a single merged [`ChangeBatch`]. The
//! renderer is subscribed to that batch like any other listener.
//!
//! # Example
//!
//! ```ignore
//! use slint_diagram_canvas::{CanvasController, FrameRecorder, PointerButton, Modifiers, Point};
//!
//! let mut ctrl = CanvasController::new();
//! ctrl.subscribe(|batch| println!("changed: {batch:?}"));
//!
//! ctrl.pointer_down(Point::new(120.0, 80.0), PointerButton::Primary, Modifiers::default());
//! ctrl.pointer_move(Point::new(160.0, 80.0));
//! ctrl.pointer_up(Point::new(160.0, 80.0));
//!
//! let mut frame = FrameRecorder::new();
//! ctrl.paint(&mut frame);
//! if let Some(edit) = ctrl.take_edit_request() {
//!     // open a text editor for edit.node
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use slint::VecModel;
use tracing::{debug, trace, warn};

use crate::alignment::{compute_alignment, AlignTarget};
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::events::{ChangeBatch, ChangeBus, SubscriptionId};
use crate::geometry::{Point, Rect, Size};
use crate::graph::{ConnectionId, NewNode, Node, NodeId, SceneGraph};
use crate::hit_test::{hit_test, nodes_in_selection_box, Hit};
use crate::path::ConnectionStyle;
use crate::render::{Overlay, PaintReport, Renderer, Surface};
use crate::shape::ShapeKind;
use crate::viewport::{ViewTransform, Viewport};

/// Active tool, chosen by the host's toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    /// Primary press places a node of this kind centred on the pointer.
    Place(ShapeKind),
    /// Primary press on a node starts a connection of this style.
    Connect(ConnectionStyle),
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false };

    /// Shift or ctrl: extend the selection instead of replacing it.
    pub fn additive(self) -> bool {
        self.shift || self.ctrl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Backspace,
    Escape,
}

/// Request to open a text editor for a freshly placed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditRequest {
    pub node: NodeId,
    pub kind: ShapeKind,
}

#[derive(Debug, Clone, Copy)]
struct PendingEdit {
    request: EditRequest,
    /// Set once a paint has completed after the request was posted.
    ready: bool,
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    Drag {
        /// Scene point under the pointer at press time.
        anchor: Point,
        primary: NodeId,
        /// Pre-drag positions, restored on cancel.
        origins: Vec<(NodeId, Point)>,
        moved: bool,
    },
    Marquee {
        start: Point,
        /// Selection to extend, empty unless the press was additive.
        base: Vec<NodeId>,
    },
    Connect {
        source: NodeId,
        style: ConnectionStyle,
    },
    Pan {
        last: Point,
    },
}

/// Owner of the scene, viewport, renderer and in-flight gesture.
pub struct CanvasController {
    config: CanvasConfig,
    graph: SceneGraph,
    viewport: Viewport,
    renderer: Rc<RefCell<Renderer>>,
    bus: ChangeBus,
    overlay: Overlay,
    overlay_changes: ChangeBatch,
    tool: Tool,
    gesture: Gesture,
    pending_edit: Option<PendingEdit>,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CanvasController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasController")
            .field("graph", &self.graph)
            .field("viewport", &self.viewport.transform())
            .field("tool", &self.tool)
            .field("gesture", &self.gesture)
            .finish()
    }
}

impl CanvasController {
    /// Create a controller with default settings.
    pub fn new() -> Self {
        Self::build(CanvasConfig::default())
    }

    pub fn with_config(config: CanvasConfig) -> Result<Self, CanvasError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CanvasConfig) -> Self {
        let renderer = Rc::new(RefCell::new(Renderer::new(&config)));
        let mut bus = ChangeBus::new();
        let sink = Rc::clone(&renderer);
        bus.subscribe(move |batch| sink.borrow_mut().apply(batch));
        Self {
            graph: SceneGraph::new(&config),
            viewport: Viewport::new(&config),
            renderer,
            bus,
            overlay: Overlay::default(),
            overlay_changes: ChangeBatch::default(),
            tool: Tool::default(),
            gesture: Gesture::Idle,
            pending_edit: None,
            config,
        }
    }

    // === Accessors ===

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn transform(&self) -> ViewTransform {
        self.viewport.transform()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Current scene-space dirty region awaiting paint.
    pub fn dirty_region(&self) -> Option<Rect> {
        self.renderer.borrow().dirty_region()
    }

    pub fn renderer(&self) -> Rc<RefCell<Renderer>> {
        Rc::clone(&self.renderer)
    }

    /// Whether a drag, marquee, connect or pan is in progress.
    pub fn is_gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Drag { .. })
    }

    // === Notifications ===

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeBatch) + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Publish everything recorded since the last cycle as one batch.
    ///
    /// Returns `false` when nothing changed.
    pub fn end_cycle(&mut self) -> bool {
        let mut batch = self.graph.take_changes();
        batch.merge(self.viewport.take_changes());
        batch.merge(self.overlay_changes.take());
        if batch.is_empty() {
            return false;
        }
        trace!(damage = batch.damage.len(), "publishing change batch");
        self.bus.publish(&batch);
        true
    }

    // === Tools ===

    /// Switch tools. Cancels any gesture and clears the selection.
    pub fn set_tool(&mut self, tool: Tool) {
        self.cancel_gesture();
        self.graph.clear_selection();
        if self.tool != tool {
            debug!(?tool, "tool changed");
        }
        self.tool = tool;
        self.end_cycle();
    }

    // === Pointer input (screen coordinates) ===

    pub fn pointer_down(&mut self, position: Point, button: PointerButton, modifiers: Modifiers) {
        if self.is_gesture_active() {
            trace!("pointer down during an active gesture ignored");
            return;
        }
        if !position.is_finite() {
            warn!(?position, "ignoring non-finite pointer position");
            return;
        }
        let scene = self.viewport.screen_to_scene(position);

        match (button, self.tool) {
            (PointerButton::Middle, _) | (PointerButton::Primary, Tool::Pan) => {
                self.gesture = Gesture::Pan { last: position };
            }
            (PointerButton::Secondary, _) => {}
            (PointerButton::Primary, Tool::Place(kind)) => {
                if let Err(err) = self.place_node_inner(kind, scene) {
                    warn!(%err, "placing node failed");
                }
            }
            (PointerButton::Primary, Tool::Connect(style)) => {
                if let Some(source) = self.graph.topmost_node_at(scene) {
                    self.gesture = Gesture::Connect { source, style };
                    self.update_connection_preview(source, scene);
                }
            }
            (PointerButton::Primary, Tool::Select) => self.press_select(scene, modifiers),
        }
        self.end_cycle();
    }

    pub fn pointer_move(&mut self, position: Point) {
        if !position.is_finite() {
            warn!(?position, "ignoring non-finite pointer position");
            return;
        }
        let scene = self.viewport.screen_to_scene(position);

        match &mut self.gesture {
            Gesture::Idle => return,
            Gesture::Pan { last } => {
                let delta = Point::new(position.x - last.x, position.y - last.y);
                *last = position;
                if let Err(err) = self.viewport.pan(delta) {
                    warn!(%err, "pan failed");
                }
            }
            Gesture::Marquee { start, .. } => {
                let rect = Rect::from_points(*start, scene);
                self.set_overlay(|o| o.marquee = Some(rect));
            }
            Gesture::Connect { source, .. } => {
                let source = *source;
                if self.graph.contains_node(source) {
                    self.update_connection_preview(source, scene);
                } else {
                    debug!(node = %source, "connection source vanished");
                    self.cancel_gesture();
                }
            }
            Gesture::Drag { .. } => self.drag_to(scene),
        }
        self.end_cycle();
    }

    pub fn pointer_up(&mut self, position: Point) {
        let position = if position.is_finite() { position } else { Point::default() };
        let scene = self.viewport.screen_to_scene(position);

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle | Gesture::Pan { .. } => {}
            Gesture::Drag { primary, moved, .. } => {
                if !moved && self.graph.selection().len() > 1 {
                    drop_stale(self.graph.select_single(primary), "select");
                }
                self.set_overlay(|o| o.guides.clear());
            }
            Gesture::Marquee { start, base } => {
                let rect = Rect::from_points(start, scene);
                let mut ids = base;
                for id in nodes_in_selection_box(&self.graph, rect) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                drop_stale(self.graph.set_selection(ids), "marquee select");
                self.set_overlay(|o| o.marquee = None);
            }
            Gesture::Connect { source, style } => {
                match self.graph.topmost_node_at(scene) {
                    Some(target) if target != source => {
                        if let Err(err) = self.graph.add_connection(source, target, style) {
                            debug!(%err, "connection not created");
                        }
                    }
                    _ => trace!("connection released without a target"),
                }
                self.set_overlay(|o| o.connection_preview = None);
            }
        }
        self.end_cycle();
    }

    /// Abort the current gesture (pointer capture lost).
    pub fn pointer_cancel(&mut self) {
        self.cancel_gesture();
        self.end_cycle();
    }

    /// Wheel zoom around the pointer. Negative `delta_y` zooms in.
    pub fn wheel(&mut self, position: Point, delta_y: f32) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let step = self.config.wheel_zoom_step;
        let factor = if delta_y < 0.0 { step } else { step.recip() };
        if let Err(err) = self.viewport.zoom_at(position, factor, self.viewport.size()) {
            warn!(%err, "wheel zoom failed");
        }
        self.end_cycle();
    }

    pub fn key_pressed(&mut self, key: Key) {
        match key {
            Key::Delete | Key::Backspace => {
                if !self.is_gesture_active() {
                    self.delete_selection_inner();
                }
            }
            Key::Escape => {
                if self.is_gesture_active() {
                    self.cancel_gesture();
                } else {
                    self.graph.clear_selection();
                }
            }
        }
        self.end_cycle();
    }

    // === Painting and deferred edits ===

    /// Publish pending changes and paint one frame.
    ///
    /// An edit request posted before this call becomes available afterwards.
    pub fn paint<S>(&mut self, surface: &mut S) -> PaintReport
    where
        S: Surface + ?Sized,
    {
        self.end_cycle();
        let report = self
            .renderer
            .borrow_mut()
            .paint(&self.graph, &self.viewport, &self.overlay, surface);
        if let Some(edit) = &mut self.pending_edit {
            edit.ready = true;
        }
        report
    }

    /// Take the pending edit request once a frame showing the node has been
    /// painted. Requests for nodes that no longer exist are dropped.
    pub fn take_edit_request(&mut self) -> Option<EditRequest> {
        let pending = self.pending_edit?;
        if !pending.ready {
            return None;
        }
        self.pending_edit = None;
        if !self.graph.contains_node(pending.request.node) {
            debug!(node = %pending.request.node, "edit request dropped, node removed");
            return None;
        }
        Some(pending.request)
    }

    /// Drop the pending edit request. Returns whether one existed.
    pub fn cancel_edit_request(&mut self) -> bool {
        self.pending_edit.take().is_some()
    }

    pub fn has_pending_edit(&self) -> bool {
        self.pending_edit.is_some()
    }

    // === Mirrored scene mutations ===

    /// Place a node of `kind` centred on a scene point.
    ///
    /// Text-capable nodes post an [`EditRequest`] for after the next paint.
    pub fn place_node(&mut self, kind: ShapeKind, scene_point: Point) -> Result<NodeId, CanvasError> {
        let result = self.place_node_inner(kind, scene_point);
        self.end_cycle();
        result
    }

    pub fn add_node(&mut self, spec: NewNode) -> Result<NodeId, CanvasError> {
        let result = self.graph.add_node(spec);
        self.end_cycle();
        result
    }

    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), CanvasError> {
        let result = self.graph.move_node(id, position);
        self.end_cycle();
        result
    }

    pub fn resize_node(&mut self, id: NodeId, size: Size) -> Result<(), CanvasError> {
        let result = self.graph.resize_node(id, size);
        self.end_cycle();
        result
    }

    pub fn update_content(&mut self, id: NodeId, text: &str) -> Result<(), CanvasError> {
        let result = self.graph.update_content(id, text);
        self.end_cycle();
        result
    }

    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, CanvasError> {
        let result = self.graph.remove_node(id);
        self.end_cycle();
        result
    }

    pub fn add_connection(
        &mut self,
        source: NodeId,
        target: NodeId,
        style: ConnectionStyle,
    ) -> Result<ConnectionId, CanvasError> {
        let result = self.graph.add_connection(source, target, style);
        self.end_cycle();
        result
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<(), CanvasError> {
        let result = self.graph.remove_connection(id).map(|_| ());
        self.end_cycle();
        result
    }

    pub fn set_selection<I>(&mut self, ids: I) -> Result<(), CanvasError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let result = self.graph.set_selection(ids);
        self.end_cycle();
        result
    }

    pub fn bring_to_front(&mut self, id: NodeId) -> Result<(), CanvasError> {
        let result = self.graph.bring_to_front(id);
        self.end_cycle();
        result
    }

    /// Delete every selected node and its connections.
    pub fn delete_selection(&mut self) -> usize {
        let removed = self.delete_selection_inner();
        self.end_cycle();
        removed
    }

    /// Copy the selection into a Slint model for the host UI.
    pub fn sync_selection_to(&self, model: &VecModel<i32>) {
        self.graph.selection().sync_to_model(model);
    }

    // === Mirrored viewport operations ===

    pub fn zoom_at(&mut self, anchor: Point, factor: f32) -> Result<bool, CanvasError> {
        let result = self.viewport.zoom_at(anchor, factor, self.viewport.size());
        self.end_cycle();
        result
    }

    pub fn pan(&mut self, delta: Point) -> Result<(), CanvasError> {
        let result = self.viewport.pan(delta);
        self.end_cycle();
        result
    }

    pub fn resize(&mut self, size: Size) -> Result<(), CanvasError> {
        let result = self.viewport.resize(size);
        self.end_cycle();
        result
    }

    /// Zoom and centre on everything in the scene. No-op on an empty scene.
    pub fn fit_to_content(&mut self, margin: f32) -> Result<(), CanvasError> {
        let result = match self.graph.content_bounds() {
            Some(bounds) => self.viewport.fit_rect(bounds, self.viewport.size(), margin),
            None => Ok(()),
        };
        self.end_cycle();
        result
    }

    // === Queries (screen coordinates) ===

    /// Node, then connection, under a screen point.
    pub fn hit_test_screen(&self, position: Point) -> Option<Hit> {
        let scene = self.viewport.screen_to_scene(position);
        let tolerance = self
            .viewport
            .screen_distance_to_scene(self.config.connection_hit_distance);
        hit_test(&self.graph, scene, tolerance)
    }

    /// Nodes overlapping a screen-space rectangle, in paint order.
    pub fn nodes_in_screen_rect(&self, rect: Rect) -> Vec<NodeId> {
        nodes_in_selection_box(&self.graph, self.viewport.screen_rect_to_scene(rect))
    }

    // === Internals ===

    fn place_node_inner(&mut self, kind: ShapeKind, scene_point: Point) -> Result<NodeId, CanvasError> {
        let id = self.graph.add_node(NewNode::centered(kind, scene_point))?;
        self.graph.select_single(id)?;
        if kind.is_text_capable() {
            if let Some(previous) = self.pending_edit.take() {
                trace!(node = %previous.request.node, "superseded edit request");
            }
            self.pending_edit = Some(PendingEdit {
                request: EditRequest { node: id, kind },
                ready: false,
            });
        }
        Ok(id)
    }

    fn press_select(&mut self, scene: Point, modifiers: Modifiers) {
        let tolerance = self
            .viewport
            .screen_distance_to_scene(self.config.connection_hit_distance);

        let node = match hit_test(&self.graph, scene, tolerance) {
            Some(Hit::Node(id)) => id,
            Some(Hit::Connection(_)) | None => {
                let base = if modifiers.additive() {
                    self.graph.selection().ids().to_vec()
                } else {
                    self.graph.clear_selection();
                    Vec::new()
                };
                self.gesture = Gesture::Marquee { start: scene, base };
                return;
            }
        };

        if modifiers.additive() {
            drop_stale(self.graph.toggle_selection(node), "toggle selection");
            return;
        }

        if !self.graph.is_selected(node) {
            drop_stale(self.graph.select_single(node), "select");
        }
        drop_stale(self.graph.bring_to_front(node), "raise");

        let origins = self
            .graph
            .selection()
            .iter()
            .filter_map(|id| self.graph.node(*id).map(|n| (n.id, n.position)))
            .collect();
        self.gesture = Gesture::Drag { anchor: scene, primary: node, origins, moved: false };
    }

    fn drag_to(&mut self, scene: Point) {
        let Gesture::Drag { anchor, primary, origins, moved } = &mut self.gesture else {
            return;
        };
        let Some((_, primary_origin)) = origins.iter().find(|(id, _)| *id == *primary).copied() else {
            return;
        };
        let Some(primary_size) = self.graph.node(*primary).map(|n| n.size) else {
            debug!(node = %primary, "dragged node vanished");
            return;
        };

        let (dx, dy) = anchor.delta_to(scene);
        let proposed = Rect::from_origin_size(primary_origin.offset(dx, dy), primary_size);

        let dragged: HashSet<NodeId> = origins.iter().map(|(id, _)| *id).collect();
        let others: Vec<AlignTarget> = self
            .graph
            .nodes_in_rect(self.viewport.visible_scene_rect())
            .into_iter()
            .filter(|id| !dragged.contains(id))
            .filter_map(|id| {
                self.graph
                    .node(id)
                    .map(|n| AlignTarget { id, rect: n.rect(), z: n.z })
            })
            .collect();
        let tolerance = self
            .viewport
            .screen_distance_to_scene(self.config.snap_tolerance);
        let alignment = compute_alignment(proposed, &others, tolerance);

        let (dx, dy) = primary_origin.delta_to(alignment.rect.origin());
        if dx != 0.0 || dy != 0.0 {
            *moved = true;
        }
        for (id, origin) in origins.iter() {
            drop_stale(self.graph.move_node(*id, origin.offset(dx, dy)), "drag");
        }
        let guides = alignment.guides;
        self.set_overlay(|o| o.guides = guides);
    }

    fn update_connection_preview(&mut self, source: NodeId, scene: Point) {
        let Some(start) = self.graph.node(source).map(Node::center) else {
            return;
        };
        self.set_overlay(|o| o.connection_preview = Some((start, scene)));
    }

    /// Roll back the current gesture without committing it.
    fn cancel_gesture(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return,
            Gesture::Drag { origins, .. } => {
                for (id, origin) in origins {
                    drop_stale(self.graph.move_node(id, origin), "restore drag");
                }
                self.set_overlay(|o| o.guides.clear());
            }
            Gesture::Marquee { .. } => self.set_overlay(|o| o.marquee = None),
            Gesture::Connect { .. } => self.set_overlay(|o| o.connection_preview = None),
            Gesture::Pan { .. } => {}
        }
        debug!("gesture cancelled");
    }

    fn delete_selection_inner(&mut self) -> usize {
        let ids = self.graph.selection().ids().to_vec();
        let removed = self.graph.remove_nodes(ids);
        if removed > 0 {
            debug!(removed, "deleted selection");
        }
        removed
    }

    /// Mutate the overlay, recording old and new bounds when it changed.
    fn set_overlay(&mut self, f: impl FnOnce(&mut Overlay)) {
        let before = self.overlay.clone();
        f(&mut self.overlay);
        if self.overlay == before {
            return;
        }
        self.overlay_changes.overlay = true;
        for bounds in [before.bounds(), self.overlay.bounds()].into_iter().flatten() {
            self.overlay_changes.add_damage(bounds);
        }
    }
}

/// Input handlers race against deletions; operations on vanished ids are
/// dropped.
fn drop_stale(result: Result<(), CanvasError>, op: &'static str) {
    match result {
        Ok(()) => {}
        Err(err) if err.is_not_found() => debug!(%err, op, "dropped stale operation"),
        Err(err) => warn!(%err, op, "operation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FrameRecorder;

    fn controller_with_node(x: f32, y: f32) -> (CanvasController, NodeId) {
        let mut ctrl = CanvasController::new();
        let id = ctrl
            .add_node(NewNode::new(ShapeKind::Rect, Point::new(x, y)).with_size(Size::new(40.0, 40.0)))
            .unwrap();
        (ctrl, id)
    }

    #[test]
    fn test_with_config_validates() {
        let config = CanvasConfig { min_zoom: 2.0, max_zoom: 1.0, ..CanvasConfig::default() };
        assert!(matches!(
            CanvasController::with_config(config),
            Err(CanvasError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_click_selects_and_raises() {
        let (mut ctrl, a) = controller_with_node(0.0, 0.0);
        let b = ctrl
            .add_node(NewNode::new(ShapeKind::Rect, Point::new(20.0, 20.0)).with_size(Size::new(40.0, 40.0)))
            .unwrap();
        ctrl.pointer_down(Point::new(5.0, 5.0), PointerButton::Primary, Modifiers::default());
        ctrl.pointer_up(Point::new(5.0, 5.0));
        assert_eq!(ctrl.graph().selection().ids(), &[a]);
        assert!(ctrl.graph().node(a).unwrap().z > ctrl.graph().node(b).unwrap().z);
    }

    #[test]
    fn test_end_cycle_publishes_once() {
        let (mut ctrl, _) = controller_with_node(0.0, 0.0);
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        ctrl.subscribe(move |_| *seen.borrow_mut() += 1);

        ctrl.pointer_down(Point::new(10.0, 10.0), PointerButton::Primary, Modifiers::default());
        assert_eq!(*count.borrow(), 1);
        assert!(!ctrl.end_cycle());
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_place_posts_edit_after_paint() {
        let mut ctrl = CanvasController::new();
        ctrl.set_tool(Tool::Place(ShapeKind::RoundedRect));
        ctrl.pointer_down(Point::new(200.0, 200.0), PointerButton::Primary, Modifiers::default());
        assert_eq!(ctrl.graph().node_count(), 1);
        assert!(ctrl.has_pending_edit());
        assert_eq!(ctrl.take_edit_request(), None);

        ctrl.paint(&mut FrameRecorder::new());
        let edit = ctrl.take_edit_request().unwrap();
        assert_eq!(edit.kind, ShapeKind::RoundedRect);
        assert_eq!(ctrl.take_edit_request(), None);
    }

    #[test]
    fn test_place_circle_posts_no_edit() {
        let mut ctrl = CanvasController::new();
        let id = ctrl.place_node(ShapeKind::Circle, Point::new(100.0, 100.0)).unwrap();
        assert_eq!(ctrl.graph().node(id).unwrap().center(), Point::new(100.0, 100.0));
        assert!(!ctrl.has_pending_edit());
    }

    #[test]
    fn test_wheel_zooms_around_pointer() {
        let mut ctrl = CanvasController::new();
        let anchor = Point::new(300.0, 200.0);
        let before = ctrl.viewport().screen_to_scene(anchor);
        ctrl.wheel(anchor, -1.0);
        assert!(ctrl.viewport().scale() > 1.0);
        let after = ctrl.viewport().screen_to_scene(anchor);
        assert!(before.distance(after) < 1e-3);
    }

    #[test]
    fn test_middle_button_pans() {
        let mut ctrl = CanvasController::new();
        ctrl.pointer_down(Point::new(100.0, 100.0), PointerButton::Middle, Modifiers::default());
        ctrl.pointer_move(Point::new(130.0, 90.0));
        ctrl.pointer_up(Point::new(130.0, 90.0));
        assert_eq!(ctrl.viewport().translation(), Point::new(30.0, -10.0));
    }

    #[test]
    fn test_set_tool_clears_selection() {
        let (mut ctrl, a) = controller_with_node(0.0, 0.0);
        ctrl.set_selection([a]).unwrap();
        ctrl.set_tool(Tool::Connect(ConnectionStyle::Arrow));
        assert!(ctrl.graph().selection().is_empty());
        assert_eq!(ctrl.tool(), Tool::Connect(ConnectionStyle::Arrow));
    }
}
