//! Scene graph: nodes, connections and the selection.
//!
//! [`SceneGraph`] is the single owner of scene state. Every mutation
//! validates first and only then touches state, so a failed call changes
//! nothing. Successful mutations record what changed (flags and damaged
//! scene rectangles) into a pending [`ChangeBatch`] that the controller drains
//! once per input cycle.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::events::ChangeBatch;
use crate::geometry::{Point, Rect, Size};
use crate::hit_test::find_connection_at;
use crate::index::{SpatialIndex, ZOrder};
use crate::path::{ConnectionGeometry, ConnectionStyle};
use crate::selection::SelectionSet;
use crate::shape::ShapeKind;

/// Extra margin around connection bounds covering stroke width.
const CONNECTION_STROKE_PAD: f32 = 2.0;

/// Stable node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i32);

/// Stable connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub i32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shape on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: ShapeKind,
    /// Scene-space top-left corner.
    pub position: Point,
    pub size: Size,
    pub content: String,
    /// Paint order; higher paints later. Unique across the scene.
    pub z: i64,
}

impl Node {
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    pub fn is_text_capable(&self) -> bool {
        self.kind.is_text_capable()
    }
}

/// A directed link between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    pub style: ConnectionStyle,
}

impl Connection {
    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Parameters for [`SceneGraph::add_node`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewNode {
    pub kind: ShapeKind,
    /// Scene-space top-left corner.
    pub position: Point,
    pub size: Size,
    pub content: String,
}

impl NewNode {
    /// Node of the kind's default size with its top-left corner at `position`.
    pub fn new(kind: ShapeKind, position: Point) -> Self {
        Self {
            kind,
            position,
            size: kind.default_size(),
            content: String::new(),
        }
    }

    /// Node of the kind's default size centred on `centre`.
    pub fn centered(kind: ShapeKind, centre: Point) -> Self {
        let size = kind.default_size();
        Self::new(kind, centre.offset(-size.width * 0.5, -size.height * 0.5))
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

// ============================================================================
// Connection Validation Framework
// ============================================================================

/// Result of connection validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }
}

/// Reasons why a validator rejected a connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cannot connect a node to itself")]
    SelfLoop,
    #[error("connection already exists")]
    DuplicateConnection,
    #[error("node {node} has reached max {max} connections")]
    MaxConnectionsReached { node: NodeId, max: usize },
    #[error("{0}")]
    Custom(String),
}

/// Custom rules for new connections.
///
/// Validators run after the mandatory endpoint check, so both ids are live
/// when `validate` is called.
///
/// ```ignore
/// struct OnlyFromDiamonds;
///
/// impl ConnectionValidator for OnlyFromDiamonds {
///     fn validate(&self, source: NodeId, _: NodeId, _: ConnectionStyle, graph: &SceneGraph) -> ValidationResult {
///         match graph.node(source) {
///             Some(n) if n.kind == ShapeKind::Diamond => ValidationResult::Valid,
///             _ => ValidationResult::Invalid(ValidationError::Custom("decisions only".into())),
///         }
///     }
/// }
/// ```
pub trait ConnectionValidator {
    fn validate(
        &self,
        source: NodeId,
        target: NodeId,
        style: ConnectionStyle,
        graph: &SceneGraph,
    ) -> ValidationResult;
}

/// Rejects connections whose source and target are the same node.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSelfLoopsValidator;

impl ConnectionValidator for NoSelfLoopsValidator {
    fn validate(&self, source: NodeId, target: NodeId, _: ConnectionStyle, _: &SceneGraph) -> ValidationResult {
        if source == target {
            ValidationResult::Invalid(ValidationError::SelfLoop)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Rejects a second connection from the same source to the same target.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesValidator;

impl ConnectionValidator for NoDuplicatesValidator {
    fn validate(&self, source: NodeId, target: NodeId, _: ConnectionStyle, graph: &SceneGraph) -> ValidationResult {
        let exists = graph
            .connections()
            .any(|c| c.source == source && c.target == target);
        if exists {
            ValidationResult::Invalid(ValidationError::DuplicateConnection)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Caps the number of connections attached to any one node.
#[derive(Clone, Copy, Debug)]
pub struct MaxConnectionsValidator {
    max: usize,
}

impl MaxConnectionsValidator {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl ConnectionValidator for MaxConnectionsValidator {
    fn validate(&self, source: NodeId, target: NodeId, _: ConnectionStyle, graph: &SceneGraph) -> ValidationResult {
        for node in [source, target] {
            if graph.connections_of(node).len() >= self.max {
                return ValidationResult::Invalid(ValidationError::MaxConnectionsReached { node, max: self.max });
            }
        }
        ValidationResult::Valid
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid (AND logic). The first failure
/// short-circuits.
///
/// ```ignore
/// graph.set_connection_validator(
///     CompositeValidator::new()
///         .add(NoSelfLoopsValidator)
///         .add(NoDuplicatesValidator),
/// );
/// ```
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl CompositeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validators are checked in the order they were added.
    pub fn add<V: ConnectionValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl ConnectionValidator for CompositeValidator {
    fn validate(&self, source: NodeId, target: NodeId, style: ConnectionStyle, graph: &SceneGraph) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(source, target, style, graph);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

// ============================================================================
// SceneGraph
// ============================================================================

/// Owner of nodes, connections and the selection.
pub struct SceneGraph {
    nodes: HashMap<NodeId, Node>,
    connections: BTreeMap<ConnectionId, Connection>,
    selection: SelectionSet,
    index: SpatialIndex,
    validator: Option<Box<dyn ConnectionValidator>>,
    next_node_id: i32,
    next_connection_id: i32,
    max_z: i64,
    max_content_len: usize,
    curve_min_offset: f32,
    hit_samples: usize,
    pending: ChangeBatch,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("selection", &self.selection.ids())
            .field("max_z", &self.max_z)
            .finish()
    }
}

impl SceneGraph {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            connections: BTreeMap::new(),
            selection: SelectionSet::new(),
            index: SpatialIndex::new(config.index_cell_size),
            validator: None,
            next_node_id: 1,
            next_connection_id: 1,
            max_z: 0,
            max_content_len: config.max_content_len,
            curve_min_offset: config.curve_min_offset,
            hit_samples: config.hit_samples,
            pending: ChangeBatch::default(),
        }
    }

    /// Whether nodes of `kind` may hold text.
    pub fn is_text_capable(kind: ShapeKind) -> bool {
        kind.is_text_capable()
    }

    pub fn set_connection_validator<V: ConnectionValidator + 'static>(&mut self, validator: V) {
        self.validator = Some(Box::new(validator));
    }

    pub fn clear_connection_validator(&mut self) {
        self.validator = None;
    }

    // === Node mutations ===

    /// Add a node on top of every existing one.
    pub fn add_node(&mut self, spec: NewNode) -> Result<NodeId, CanvasError> {
        check_position(spec.position)?;
        check_size(spec.size)?;
        if !spec.content.is_empty() {
            self.check_content(spec.kind, &spec.content)?;
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.max_z += 1;
        let node = Node {
            id,
            kind: spec.kind,
            position: spec.position,
            size: spec.size,
            content: spec.content,
            z: self.max_z,
        };
        let rect = node.rect();
        self.index.insert(id, rect, node.z);
        self.nodes.insert(id, node);

        self.pending.scene = true;
        self.pending.add_damage(rect);
        debug!(node = %id, kind = %spec.kind, "node added");
        Ok(id)
    }

    /// Move a node's top-left corner.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), CanvasError> {
        let old = self.node_rect(id)?;
        check_position(position)?;
        if old.origin() == position {
            return Ok(());
        }
        self.set_node_rect(id, old, old.with_origin(position));
        Ok(())
    }

    /// Change a node's size, keeping its top-left corner.
    pub fn resize_node(&mut self, id: NodeId, size: Size) -> Result<(), CanvasError> {
        let old = self.node_rect(id)?;
        check_size(size)?;
        if old.size() == size {
            return Ok(());
        }
        self.set_node_rect(id, old, Rect::from_origin_size(old.origin(), size));
        Ok(())
    }

    /// Replace a node's text.
    pub fn update_content(&mut self, id: NodeId, text: &str) -> Result<(), CanvasError> {
        let node = self.nodes.get(&id).ok_or(CanvasError::NodeNotFound(id))?;
        self.check_content(node.kind, text)?;
        if node.content == text {
            return Ok(());
        }
        let rect = node.rect();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.content = text.to_owned();
        }
        self.pending.scene = true;
        self.pending.add_damage(rect);
        debug!(node = %id, len = text.chars().count(), "content updated");
        Ok(())
    }

    /// Delete a node and every connection referencing it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, CanvasError> {
        if !self.nodes.contains_key(&id) {
            return Err(CanvasError::NodeNotFound(id));
        }

        let attached = self.connections_of(id);
        for cid in &attached {
            if let Some(bounds) = self.connection_bounds(*cid) {
                self.pending.add_damage(bounds);
            }
            self.connections.remove(cid);
        }

        let node = self.nodes.remove(&id).ok_or(CanvasError::NodeNotFound(id))?;
        self.index.remove(id);
        if self.selection.remove(id) {
            self.pending.selection = true;
        }
        self.pending.scene = true;
        self.pending.add_damage(node.rect());
        debug!(node = %id, connections = attached.len(), "node removed");
        Ok(node)
    }

    /// Delete several nodes, skipping ids that are already gone.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_nodes<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut removed = 0;
        for id in ids {
            match self.remove_node(id) {
                Ok(_) => removed += 1,
                Err(err) => debug!(%err, "skipping stale node in batch delete"),
            }
        }
        removed
    }

    /// Raise a node above every other one.
    pub fn bring_to_front(&mut self, id: NodeId) -> Result<(), CanvasError> {
        let node = self.nodes.get_mut(&id).ok_or(CanvasError::NodeNotFound(id))?;
        if node.z == self.max_z {
            return Ok(());
        }
        self.max_z += 1;
        node.z = self.max_z;
        let rect = node.rect();
        self.index.set_z(id, self.max_z);
        self.pending.scene = true;
        self.pending.add_damage(rect);
        debug!(node = %id, z = self.max_z, "node raised");
        Ok(())
    }

    // === Connection mutations ===

    /// Link `source` to `target`.
    pub fn add_connection(
        &mut self,
        source: NodeId,
        target: NodeId,
        style: ConnectionStyle,
    ) -> Result<ConnectionId, CanvasError> {
        for endpoint in [source, target] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(CanvasError::NodeNotFound(endpoint));
            }
        }
        if let Some(validator) = &self.validator {
            if let ValidationResult::Invalid(reason) = validator.validate(source, target, style, self) {
                warn!(%source, %target, %reason, "connection rejected");
                return Err(CanvasError::ConnectionRejected(reason));
            }
        }

        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.insert(id, Connection { id, source, target, style });
        if let Some(bounds) = self.connection_bounds(id) {
            self.pending.add_damage(bounds);
        }
        self.pending.scene = true;
        debug!(connection = %id, %source, %target, ?style, "connection added");
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<Connection, CanvasError> {
        let bounds = self.connection_bounds(id);
        let connection = self
            .connections
            .remove(&id)
            .ok_or(CanvasError::ConnectionNotFound(id))?;
        if let Some(bounds) = bounds {
            self.pending.add_damage(bounds);
        }
        self.pending.scene = true;
        debug!(connection = %id, "connection removed");
        Ok(connection)
    }

    // === Selection ===

    /// Replace the selection. Fails without change if any id is unknown.
    pub fn set_selection<I>(&mut self, ids: I) -> Result<(), CanvasError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let ids: Vec<NodeId> = ids.into_iter().collect();
        if let Some(&missing) = ids.iter().find(|id| !self.nodes.contains_key(id)) {
            return Err(CanvasError::NodeNotFound(missing));
        }
        let before = self.selection.ids().to_vec();
        if self.selection.replace_selection(ids) {
            self.selection_changed(&before);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        let before = self.selection.ids().to_vec();
        if self.selection.clear() {
            self.selection_changed(&before);
        }
    }

    /// Shift-click behaviour: add or remove `id`.
    pub fn toggle_selection(&mut self, id: NodeId) -> Result<(), CanvasError> {
        self.interact(id, true)
    }

    /// Plain-click behaviour: collapse the selection to `id`.
    pub fn select_single(&mut self, id: NodeId) -> Result<(), CanvasError> {
        self.interact(id, false)
    }

    fn interact(&mut self, id: NodeId, shift_held: bool) -> Result<(), CanvasError> {
        if !self.nodes.contains_key(&id) {
            return Err(CanvasError::NodeNotFound(id));
        }
        let before = self.selection.ids().to_vec();
        if self.selection.handle_interaction(id, shift_held) {
            self.selection_changed(&before);
        }
        Ok(())
    }

    fn selection_changed(&mut self, before: &[NodeId]) {
        self.pending.selection = true;
        let rects: Vec<Rect> = before
            .iter()
            .chain(self.selection.ids())
            .filter_map(|id| self.nodes.get(id).map(Node::rect))
            .collect();
        self.pending.damage.extend(rects);
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn is_selected(&self, id: NodeId) -> bool {
        self.selection.contains(id)
    }

    // === Queries ===

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// All connections, ordered by id.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections with `node` as source or target, ordered by id.
    pub fn connections_of(&self, node: NodeId) -> Vec<ConnectionId> {
        self.connections
            .values()
            .filter(|c| c.touches(node))
            .map(|c| c.id)
            .collect()
    }

    /// Nodes overlapping `rect`, in paint order (lowest z first).
    pub fn nodes_in_rect(&self, rect: Rect) -> Vec<NodeId> {
        self.index.query_rect(rect, ZOrder::Paint)
    }

    /// Nodes containing `p`, topmost first.
    pub fn nodes_at(&self, p: Point) -> Vec<NodeId> {
        self.index.query_point(p, ZOrder::TopmostFirst)
    }

    pub fn topmost_node_at(&self, p: Point) -> Option<NodeId> {
        self.index.topmost_at(p)
    }

    /// Scene-space geometry of a connection.
    pub fn connection_geometry(&self, id: ConnectionId) -> Option<ConnectionGeometry> {
        let c = self.connections.get(&id)?;
        let source = self.nodes.get(&c.source)?.rect();
        let target = self.nodes.get(&c.target)?.rect();
        Some(ConnectionGeometry::between(source, target, c.style, self.curve_min_offset))
    }

    /// Bounding rectangle of a drawn connection, stroke included.
    pub fn connection_bounds(&self, id: ConnectionId) -> Option<Rect> {
        self.connection_geometry(id)
            .map(|g| g.bounds().inflate(CONNECTION_STROKE_PAD))
    }

    /// Connections whose bounds overlap `rect`, ordered by id.
    pub fn connections_in_rect(&self, rect: Rect) -> Vec<ConnectionId> {
        self.connections
            .keys()
            .copied()
            .filter(|&id| self.connection_bounds(id).is_some_and(|b| b.intersects(&rect)))
            .collect()
    }

    /// Closest connection within `tolerance` scene units of `p`.
    pub fn connection_at(&self, p: Point, tolerance: f32) -> Option<ConnectionId> {
        let geometries = self
            .connections
            .keys()
            .filter_map(|&id| self.connection_geometry(id).map(|g| (id, g)));
        find_connection_at(p, geometries, tolerance, self.hit_samples)
    }

    /// Union of every node rectangle and connection bound.
    pub fn content_bounds(&self) -> Option<Rect> {
        let node_rects = self.nodes.values().map(Node::rect);
        let connection_rects = self
            .connections
            .keys()
            .filter_map(|&id| self.connection_bounds(id));
        node_rects
            .chain(connection_rects)
            .reduce(|acc, r| acc.union(&r))
    }

    /// Highest z currently assigned.
    pub fn max_z(&self) -> i64 {
        self.max_z
    }

    pub fn max_content_len(&self) -> usize {
        self.max_content_len
    }

    /// Rebuild the spatial index from the node table.
    pub fn rebuild_index(&mut self) {
        let entries: Vec<_> = self.nodes.values().map(|n| (n.id, n.rect(), n.z)).collect();
        self.index.rebuild(entries);
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Drain the changes recorded since the last call.
    pub fn take_changes(&mut self) -> ChangeBatch {
        self.pending.take()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    // === Internals ===

    fn node_rect(&self, id: NodeId) -> Result<Rect, CanvasError> {
        self.nodes
            .get(&id)
            .map(Node::rect)
            .ok_or(CanvasError::NodeNotFound(id))
    }

    fn check_content(&self, kind: ShapeKind, text: &str) -> Result<(), CanvasError> {
        if !kind.is_text_capable() {
            warn!(%kind, "rejected content on a shape without text");
            return Err(CanvasError::Unsupported { kind });
        }
        let len = text.chars().count();
        if len > self.max_content_len {
            return Err(CanvasError::Overflow { len, max: self.max_content_len });
        }
        Ok(())
    }

    /// Apply a geometry change, recording prior and new footprints of the
    /// node and of every attached connection.
    fn set_node_rect(&mut self, id: NodeId, old: Rect, new: Rect) {
        let attached = self.connections_of(id);
        for cid in &attached {
            if let Some(bounds) = self.connection_bounds(*cid) {
                self.pending.add_damage(bounds);
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = new.origin();
            node.size = new.size();
        }
        self.index.update(id, new);

        for cid in &attached {
            if let Some(bounds) = self.connection_bounds(*cid) {
                self.pending.add_damage(bounds);
            }
        }
        self.pending.add_damage(old);
        self.pending.add_damage(new);
        self.pending.scene = true;
    }
}

fn check_position(p: Point) -> Result<(), CanvasError> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(CanvasError::InvalidGeometry(format!("position {p:?}")))
    }
}

fn check_size(size: Size) -> Result<(), CanvasError> {
    if size.is_positive() {
        Ok(())
    } else {
        Err(CanvasError::InvalidGeometry(format!(
            "size {}x{}",
            size.width, size.height
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================
