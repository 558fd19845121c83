//! Layered auto-layout of the scene.
//!
//! Positions are computed with the Sugiyama algorithm from the `rust-sugiyama`
//! crate, which works in `f64`; results are converted back to scene `f32`
//! coordinates. Connections define the layering; self loops and parallel
//! connections are collapsed before layout.
//!
//! Requires the `layout` feature to be enabled.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::CanvasError;
use crate::geometry::{Point, Size};
use crate::graph::{NodeId, SceneGraph};

/// Layout direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Direction {
    /// Layers flow top to bottom (default).
    #[default]
    TopToBottom,
    LeftToRight,
}

/// A laid-out node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub id: NodeId,
    /// New top-left corner in scene units.
    pub position: Point,
}

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct LayoutConfig {
    /// Minimum spacing between nodes; 0 keeps the `rust-sugiyama` default.
    pub vertex_spacing: f64,
    /// Minimum connection length in layers; 0 keeps the default of 1.
    pub minimum_length: u32,
    pub dummy_vertices: bool,
    pub direction: Direction,
    /// Added to every resulting position.
    pub origin: Point,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertex_spacing: 0.0,
            minimum_length: 0,
            dummy_vertices: false,
            direction: Direction::TopToBottom,
            origin: Point::default(),
        }
    }
}

/// Compute layered positions for `nodes`, layered along `edges`.
///
/// Edges with an endpoint missing from `nodes` are skipped. Duplicate node
/// ids keep their first size.
pub fn layered_layout(
    edges: &[(NodeId, NodeId)],
    nodes: &[(NodeId, Size)],
    config: &LayoutConfig,
) -> Vec<NodePosition> {
    if nodes.is_empty() {
        return Vec::new();
    }

    let horizontal = config.direction == Direction::LeftToRight;

    let mut index_of: HashMap<NodeId, u32> = HashMap::new();
    let mut ids: Vec<NodeId> = Vec::with_capacity(nodes.len());
    let mut vertices: Vec<(u32, (f64, f64))> = Vec::with_capacity(nodes.len());
    for &(id, size) in nodes {
        if index_of.contains_key(&id) {
            continue;
        }
        let idx = ids.len() as u32;
        index_of.insert(id, idx);
        ids.push(id);
        // Horizontal layouts run the algorithm on transposed sizes.
        let (w, h) = (size.width as f64, size.height as f64);
        vertices.push((idx, if horizontal { (h, w) } else { (w, h) }));
    }

    let mapped_edges: Vec<(u32, u32)> = edges
        .iter()
        .filter_map(|(src, dst)| Some((*index_of.get(src)?, *index_of.get(dst)?)))
        .collect();

    let mut sg_config = rust_sugiyama::configure::Config {
        dummy_vertices: config.dummy_vertices,
        ..Default::default()
    };
    if config.vertex_spacing > 0.0 {
        sg_config.vertex_spacing = config.vertex_spacing;
    }
    if config.minimum_length > 0 {
        sg_config.minimum_length = config.minimum_length;
    }

    let subgraphs = rust_sugiyama::from_vertices_and_edges(&vertices, &mapped_edges, &sg_config);

    let mut results = Vec::with_capacity(ids.len());
    for (layout, _width, _height) in &subgraphs {
        for &(idx, (x, y)) in layout {
            let Some(&id) = ids.get(idx) else {
                continue;
            };
            let (px, py) = if horizontal { (y, x) } else { (x, y) };
            results.push(NodePosition {
                id,
                position: config.origin.offset(px as f32, py as f32),
            });
        }
    }
    results
}

/// Lay out every node in the scene along its connections.
pub fn layout_scene(graph: &SceneGraph, config: &LayoutConfig) -> Vec<NodePosition> {
    let edges: Vec<(NodeId, NodeId)> = graph
        .connections()
        .filter(|c| c.source != c.target)
        .map(|c| (c.source, c.target))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut nodes: Vec<(NodeId, Size)> = graph.nodes().map(|n| (n.id, n.size)).collect();
    // Node storage is unordered; sort so layouts are reproducible.
    nodes.sort_by_key(|(id, _)| *id);

    layered_layout(&edges, &nodes, config)
}

/// Move nodes to computed positions. Returns how many nodes moved.
///
/// Positions for nodes that no longer exist are skipped.
pub fn apply_layout(graph: &mut SceneGraph, positions: &[NodePosition]) -> Result<usize, CanvasError> {
    let mut moved = 0;
    for p in positions {
        let Some(before) = graph.node(p.id).map(|n| n.position) else {
            debug!(node = %p.id, "skipping layout for removed node");
            continue;
        };
        graph.move_node(p.id, p.position)?;
        if before != p.position {
            moved += 1;
        }
    }
    debug!(moved, "layout applied");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NewNode;
    use crate::path::ConnectionStyle;
    use crate::shape::ShapeKind;

    fn positions(result: Vec<NodePosition>) -> HashMap<NodeId, Point> {
        result.into_iter().map(|p| (p.id, p.position)).collect()
    }

    fn box_size() -> Size {
        Size::new(80.0, 40.0)
    }

    #[test]
    fn test_empty_input() {
        assert!(layered_layout(&[], &[], &LayoutConfig::default()).is_empty());
    }

    #[test]
    fn test_chain_is_layered_top_to_bottom() {
        let (a, b) = (NodeId(10), NodeId(20));
        let result = layered_layout(&[(a, b)], &[(a, box_size()), (b, box_size())], &LayoutConfig::default());
        let pos = positions(result);
        assert_eq!(pos.len(), 2);
        assert!(pos[&a].y < pos[&b].y);
    }

    #[test]
    fn test_diamond_middle_layer_shared() {
        let ids: Vec<NodeId> = (1..=4).map(NodeId).collect();
        let nodes: Vec<_> = ids.iter().map(|&id| (id, box_size())).collect();
        let edges = [(ids[0], ids[1]), (ids[0], ids[2]), (ids[1], ids[3]), (ids[2], ids[3])];
        let pos = positions(layered_layout(&edges, &nodes, &LayoutConfig::default()));
        assert!(pos[&ids[0]].y < pos[&ids[3]].y);
        assert!((pos[&ids[1]].y - pos[&ids[2]].y).abs() < 1.0);
    }

    #[test]
    fn test_unknown_endpoints_and_duplicates_ignored() {
        let a = NodeId(1);
        let result = layered_layout(
            &[(a, NodeId(999))],
            &[(a, box_size()), (a, Size::new(300.0, 300.0))],
            &LayoutConfig::default(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, a);
    }

    #[test]
    fn test_left_to_right_separates_in_x() {
        let (a, b) = (NodeId(1), NodeId(2));
        let config = LayoutConfig { direction: Direction::LeftToRight, ..LayoutConfig::default() };
        let pos = positions(layered_layout(&[(a, b)], &[(a, box_size()), (b, box_size())], &config));
        assert!(pos[&a].x < pos[&b].x);
    }

    #[test]
    fn test_cycle_does_not_panic() {
        let ids: Vec<NodeId> = (1..=3).map(NodeId).collect();
        let nodes: Vec<_> = ids.iter().map(|&id| (id, box_size())).collect();
        let edges = [(ids[0], ids[1]), (ids[1], ids[2]), (ids[2], ids[0])];
        let result = layered_layout(&edges, &nodes, &LayoutConfig::default());
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|p| p.position.is_finite()));
    }

    #[test]
    fn test_layout_scene_and_apply() {
        let mut graph = SceneGraph::default();
        let a = graph.add_node(NewNode::new(ShapeKind::Rect, Point::new(500.0, 500.0))).unwrap();
        let b = graph.add_node(NewNode::new(ShapeKind::Rect, Point::new(500.0, 500.0))).unwrap();
        graph.add_connection(a, b, ConnectionStyle::Arrow).unwrap();
        graph.add_connection(a, b, ConnectionStyle::Line).unwrap();
        graph.add_connection(a, a, ConnectionStyle::Line).unwrap();
        graph.take_changes();

        let layout = layout_scene(&graph, &LayoutConfig::default());
        assert_eq!(layout.len(), 2);
        apply_layout(&mut graph, &layout).unwrap();

        let (pa, pb) = (graph.node(a).unwrap().position, graph.node(b).unwrap().position);
        assert!(pa.y < pb.y);
        assert!(graph.take_changes().scene);
    }

    #[test]
    fn test_apply_skips_removed_nodes() {
        let mut graph = SceneGraph::default();
        let a = graph.add_node(NewNode::new(ShapeKind::Rect, Point::new(0.0, 0.0))).unwrap();
        let stale = NodePosition { id: NodeId(77), position: Point::new(5.0, 5.0) };
        let fresh = NodePosition { id: a, position: Point::new(30.0, 40.0) };
        assert_eq!(apply_layout(&mut graph, &[stale, fresh]).unwrap(), 1);
        assert_eq!(graph.node(a).unwrap().position, Point::new(30.0, 40.0));
    }
}
