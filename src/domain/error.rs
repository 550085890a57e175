//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors represent violations of the board's structural rules.
/// These are independent of persistence and configuration concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found on board: {0}")]
    UnknownNode(NodeId),

    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("board structure inconsistent at {node}: {message}")]
    Inconsistent { node: NodeId, message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
