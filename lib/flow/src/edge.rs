//! Edge types for flow graphs.
//!
//! An edge is a directed connection between two node ids. Endpoints are not
//! required to resolve to nodes: flows are authored interactively and may
//! transiently reference stale ids, so a dangling edge is inert during
//! traversal rather than a validation failure.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// A directed edge between two nodes in a flow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// The source node id.
    pub from: NodeId,
    /// The target node id.
    pub to: NodeId,
}

impl Edge {
    /// Creates a new edge.
    #[must_use]
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns true if this edge starts and ends at the same node.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_creation() {
        let edge = Edge::new("t1", "c1");
        assert_eq!(edge.from.as_str(), "t1");
        assert_eq!(edge.to.as_str(), "c1");
        assert!(!edge.is_self_loop());
    }

    #[test]
    fn self_loop_detection() {
        let edge = Edge::new("t1", "t1");
        assert!(edge.is_self_loop());
    }

    #[test]
    fn edge_serde_roundtrip() {
        let edge = Edge::new("c1", "a1");
        let json = serde_json::to_string(&edge).expect("serialize");
        let parsed: Edge = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(edge, parsed);
    }
}
