//! Error types for the flow crate.
//!
//! Only structural problems detected before traversal starts are fatal:
//! `GraphError` surfaces to the caller and execution does not proceed.
//! Everything the engine encounters while walking a graph (conditions that
//! fail to evaluate, dangling edge targets, cycles) is absorbed into the
//! execution trace instead of aborting the call.

use crate::node::NodeId;
use courier_core::FlowId;
use std::fmt;

/// Errors from flow graph construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node was submitted with an empty id.
    EmptyNodeId {
        /// Zero-based position of the node in the submitted list.
        position: usize,
    },
    /// Two nodes share the same id.
    DuplicateNodeId { node_id: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNodeId { position } => {
                write!(f, "node at position {position} has an empty id")
            }
            Self::DuplicateNodeId { node_id } => {
                write!(f, "duplicate node id: {node_id}")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Errors from condition expression evaluation.
///
/// These never abort an execution call. The engine records the failure in
/// the trace, treats the condition as false, and stops that path only.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression could not be tokenized or parsed.
    Syntax {
        /// Byte offset into the expression where the problem was found.
        position: usize,
        message: String,
    },
    /// The expression referenced a name outside the `ctx` namespace.
    UnknownIdentifier { name: String },
    /// An operator was applied to operand types it does not support.
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax { position, message } => {
                write!(f, "syntax error at offset {position}: {message}")
            }
            Self::UnknownIdentifier { name } => {
                write!(f, "unknown identifier '{name}'")
            }
            Self::TypeMismatch { op, lhs, rhs } => {
                write!(f, "type mismatch: {lhs} {op} {rhs}")
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Errors from flow registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No flow is stored under the given id.
    FlowNotFound { flow_id: FlowId },
    /// A stored flow failed structural validation when executed.
    MalformedFlow { flow_id: FlowId, details: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlowNotFound { flow_id } => {
                write!(f, "flow not found: {flow_id}")
            }
            Self::MalformedFlow { flow_id, details } => {
                write!(f, "flow {flow_id} has a malformed graph: {details}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let err = GraphError::DuplicateNodeId {
            node_id: NodeId::new("t1"),
        };
        assert!(err.to_string().contains("duplicate node id: t1"));
    }

    #[test]
    fn graph_error_empty_id_display() {
        let err = GraphError::EmptyNodeId { position: 2 };
        assert!(err.to_string().contains("position 2"));
    }

    #[test]
    fn eval_error_display() {
        let err = EvalError::TypeMismatch {
            op: "<",
            lhs: "string",
            rhs: "number",
        };
        assert_eq!(err.to_string(), "type mismatch: string < number");
    }

    #[test]
    fn registry_error_display() {
        let flow_id = FlowId::new();
        let err = RegistryError::FlowNotFound { flow_id };
        assert!(err.to_string().contains("flow not found"));
    }
}
