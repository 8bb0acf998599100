use thiserror::Error;

use super::node::NodeId;

/// Errors that can occur during B-tree operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BTreeError {
    #[error("Invalid order: {0} (must be >= 2)")]
    InvalidOrder(usize),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Height limit reached: tree already has {0} levels")]
    HeightLimit(usize),

    #[error("Invalid tree state: {0}")]
    InvalidState(String),
}

pub type BTreeResult<T> = Result<T, BTreeError>;
