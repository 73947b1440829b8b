//! Validated, indexed flow graphs.
//!
//! [`FlowGraph::build`] lowers caller-submitted node specs into typed nodes,
//! enforces the structural invariants (non-empty, unique node ids), and
//! builds the id and adjacency indexes traversal relies on. The graph is
//! immutable after construction and owns its node and edge lists for the
//! duration of one execution.
//!
//! Outgoing edges keep their input order: when a node has several outgoing
//! edges, traversal follows the one that appeared first in the submitted
//! edge list and ignores the rest. A petgraph mirror of the resolvable
//! edges is kept for structural diagnostics (cycle and dangling-edge
//! detection); cycles are legal here, unlike in DAG executors, because the
//! engine halts a path on revisit.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::node::{Node, NodeId, NodeKind, NodeSpec};
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use tracing::warn;

/// A validated flow graph with O(1) node and adjacency lookup.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    /// Nodes in input order.
    nodes: Vec<Node>,
    /// Edges in input order.
    edges: Vec<Edge>,
    /// Map from node id to index into `nodes`.
    node_index: HashMap<NodeId, usize>,
    /// Map from node id to indices into `edges`, preserving input order.
    outgoing: HashMap<NodeId, Vec<usize>>,
    /// Whether the resolvable edges contain a cycle.
    cyclic: bool,
    /// Number of edges with at least one unresolvable endpoint.
    dangling_edges: usize,
}

impl FlowGraph {
    /// Builds a graph from caller-submitted node specs and edges.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if any node id is empty or duplicated.
    /// Edges referencing unknown node ids do not fail construction; they
    /// are simply inert during traversal.
    pub fn build(specs: &[NodeSpec], edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut nodes = Vec::with_capacity(specs.len());
        let mut node_index = HashMap::with_capacity(specs.len());

        for (position, spec) in specs.iter().enumerate() {
            if spec.id.is_empty() {
                return Err(GraphError::EmptyNodeId { position });
            }
            if node_index.contains_key(&spec.id) {
                return Err(GraphError::DuplicateNodeId {
                    node_id: spec.id.clone(),
                });
            }
            node_index.insert(spec.id.clone(), position);
            nodes.push(Node::from_spec(spec));
        }

        let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (index, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.from.clone()).or_default().push(index);
        }

        let (cyclic, dangling_edges) = Self::diagnose(&nodes, &edges, &node_index);
        if cyclic {
            warn!("flow graph contains a cycle, traversal will halt on revisit");
        }
        if dangling_edges > 0 {
            warn!(dangling_edges, "flow graph has edges to unknown node ids");
        }

        Ok(Self {
            nodes,
            edges,
            node_index,
            outgoing,
            cyclic,
            dangling_edges,
        })
    }

    /// Mirrors the resolvable edges into a petgraph digraph and checks for
    /// cycles, counting unresolvable edges along the way.
    fn diagnose(
        nodes: &[Node],
        edges: &[Edge],
        node_index: &HashMap<NodeId, usize>,
    ) -> (bool, usize) {
        let mut mirror: DiGraph<(), ()> = DiGraph::with_capacity(nodes.len(), edges.len());
        let indices: Vec<_> = nodes.iter().map(|_| mirror.add_node(())).collect();

        let mut dangling = 0;
        for edge in edges {
            match (node_index.get(&edge.from), node_index.get(&edge.to)) {
                (Some(&from), Some(&to)) => {
                    mirror.add_edge(indices[from], indices[to], ());
                }
                _ => dangling += 1,
            }
        }

        (petgraph::algo::is_cyclic_directed(&mirror), dangling)
    }

    /// Returns a reference to a node by its id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        let index = self.node_index.get(id)?;
        self.nodes.get(*index)
    }

    /// Returns all nodes in input order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns nodes of the given kind, preserving input order.
    pub fn nodes_by_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |node| node.kind() == kind)
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the outgoing edges of a node, in input order.
    pub fn outgoing_edges(&self, id: &NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id)
            .into_iter()
            .flatten()
            .map(|&index| &self.edges[index])
    }

    /// Returns the first outgoing edge of a node by input order, if any.
    ///
    /// This is the edge traversal follows; additional outgoing edges are
    /// tolerated but ignored (single-path interpretation, no fan-out).
    #[must_use]
    pub fn first_edge_from(&self, id: &NodeId) -> Option<&Edge> {
        self.outgoing_edges(id).next()
    }

    /// Returns true if the resolvable edges contain a cycle.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }

    /// Returns the number of edges with at least one unknown endpoint.
    #[must_use]
    pub fn dangling_edge_count(&self) -> usize {
        self.dangling_edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(id: &str, kind: NodeKind) -> NodeSpec {
        NodeSpec::new(id, kind, serde_json::Map::new())
    }

    fn trigger_spec(id: &str, name: &str) -> NodeSpec {
        NodeSpec::new(
            id,
            NodeKind::Trigger,
            json!({"name": name}).as_object().expect("object").clone(),
        )
    }

    #[test]
    fn build_indexes_nodes() {
        let specs = vec![trigger_spec("t1", "start"), spec("a1", NodeKind::Action)];
        let graph = FlowGraph::build(&specs, vec![Edge::new("t1", "a1")]).expect("build");

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.node(&NodeId::new("t1")).is_some());
        assert!(graph.node(&NodeId::new("missing")).is_none());
    }

    #[test]
    fn build_rejects_empty_node_id() {
        let specs = vec![trigger_spec("t1", "start"), spec("", NodeKind::Action)];
        let result = FlowGraph::build(&specs, vec![]);
        assert_eq!(result.unwrap_err(), GraphError::EmptyNodeId { position: 1 });
    }

    #[test]
    fn build_rejects_duplicate_node_id() {
        let specs = vec![spec("n1", NodeKind::Trigger), spec("n1", NodeKind::Action)];
        let result = FlowGraph::build(&specs, vec![]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::DuplicateNodeId {
                node_id: NodeId::new("n1")
            }
        );
    }

    #[test]
    fn build_tolerates_dangling_edges() {
        let specs = vec![spec("t1", NodeKind::Trigger)];
        let graph =
            FlowGraph::build(&specs, vec![Edge::new("t1", "ghost")]).expect("build succeeds");
        assert_eq!(graph.dangling_edge_count(), 1);
    }

    #[test]
    fn nodes_by_kind_preserves_input_order() {
        let specs = vec![
            trigger_spec("t2", "second"),
            spec("a1", NodeKind::Action),
            trigger_spec("t1", "first"),
        ];
        let graph = FlowGraph::build(&specs, vec![]).expect("build");

        let triggers: Vec<_> = graph
            .nodes_by_kind(NodeKind::Trigger)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(triggers, vec!["t2", "t1"]);
    }

    #[test]
    fn first_edge_respects_input_order() {
        let specs = vec![
            spec("t1", NodeKind::Trigger),
            spec("a1", NodeKind::Action),
            spec("a2", NodeKind::Action),
        ];
        let edges = vec![Edge::new("t1", "a1"), Edge::new("t1", "a2")];
        let graph = FlowGraph::build(&specs, edges).expect("build");

        let first = graph.first_edge_from(&NodeId::new("t1")).expect("edge");
        assert_eq!(first.to.as_str(), "a1");
        assert_eq!(graph.outgoing_edges(&NodeId::new("t1")).count(), 2);
    }

    #[test]
    fn cycle_detection_flags_self_loop() {
        let specs = vec![spec("t1", NodeKind::Trigger)];
        let graph = FlowGraph::build(&specs, vec![Edge::new("t1", "t1")]).expect("build");
        assert!(graph.is_cyclic());
    }

    #[test]
    fn cycle_detection_flags_longer_cycle() {
        let specs = vec![
            spec("a", NodeKind::Trigger),
            spec("b", NodeKind::Action),
            spec("c", NodeKind::Action),
        ];
        let edges = vec![
            Edge::new("a", "b"),
            Edge::new("b", "c"),
            Edge::new("c", "a"),
        ];
        let graph = FlowGraph::build(&specs, edges).expect("build");
        assert!(graph.is_cyclic());
    }

    #[test]
    fn acyclic_chain_is_not_flagged() {
        let specs = vec![
            spec("a", NodeKind::Trigger),
            spec("b", NodeKind::Condition),
            spec("c", NodeKind::Action),
        ];
        let edges = vec![Edge::new("a", "b"), Edge::new("b", "c")];
        let graph = FlowGraph::build(&specs, edges).expect("build");
        assert!(!graph.is_cyclic());
        assert_eq!(graph.dangling_edge_count(), 0);
    }

    #[test]
    fn empty_graph_builds() {
        let graph = FlowGraph::build(&[], vec![]).expect("build");
        assert_eq!(graph.node_count(), 0);
        assert!(!graph.is_cyclic());
    }
}
