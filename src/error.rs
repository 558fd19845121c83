//! Error taxonomy shared by every mutating operation.

use thiserror::Error;

use crate::graph::{ConnectionId, NodeId, ValidationError};
use crate::shape::ShapeKind;

/// Errors returned by scene, viewport and configuration operations.
///
/// Every variant is returned before any state is touched, so a failed call
/// never leaves a partial mutation or a pending notification behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("{kind} nodes do not carry text content")]
    Unsupported { kind: ShapeKind },

    #[error("invalid viewport transform: {0}")]
    InvalidTransform(String),

    #[error("content too long: {len} characters (max {max})")]
    Overflow { len: usize, max: usize },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("connection rejected: {0}")]
    ConnectionRejected(#[from] ValidationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CanvasError {
    /// True for the two "stale id" variants that queued input may safely drop.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::ConnectionNotFound(_))
    }
}
