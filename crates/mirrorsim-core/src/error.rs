//! Error types for mirrorsim

use thiserror::Error;

use crate::types::{NodeId, StructureType};

/// Errors raised by structural mutation and probing
///
/// Validation is a predicate and never produces one of these; a missing
/// head is an `Option`, not an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructureError {
    #[error("Invalid edge specification {owner} -> {child}: no head id for {missing:?}")]
    InvalidEdgeSpecification {
        owner: NodeId,
        child: NodeId,
        missing: Vec<StructureType>,
    },

    #[error("Node {0} cannot be its own child")]
    SelfEdge(NodeId),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("No edge {owner} -> {child}")]
    MissingEdge { owner: NodeId, child: NodeId },

    #[error("Invalid {shape} parameter: {reason}")]
    InvalidShapeParameter {
        shape: StructureType,
        reason: String,
    },

    #[error("Node {0} has no parent to re-home its children to")]
    NoParent(NodeId),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),
}

/// Result type for structural operations
pub type StructureResult<T> = Result<T, StructureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_edge_message_names_missing_types() {
        let err = StructureError::InvalidEdgeSpecification {
            owner: NodeId(1),
            child: NodeId(2),
            missing: vec![StructureType::Ring],
        };
        let message = err.to_string();
        assert!(message.contains("n1 -> n2"));
        assert!(message.contains("Ring"));
    }
}
