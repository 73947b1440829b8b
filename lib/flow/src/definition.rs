//! Named flow definitions.
//!
//! A flow definition is the persisted form of an automation: an owner, a
//! name, and the node and edge lists the editor produced. The engine never
//! loads definitions itself; a surrounding service fetches one and hands
//! its nodes and edges to [`crate::engine::execute`]. `execute` here is a
//! convenience that does exactly that.

use crate::edge::Edge;
use crate::engine::{self, ExecuteResult};
use crate::error::GraphError;
use crate::graph::FlowGraph;
use crate::node::NodeSpec;
use chrono::{DateTime, Utc};
use courier_core::{FlowId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A named, persisted flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinition {
    /// Unique identifier for this flow.
    pub id: FlowId,
    /// The user who owns this flow.
    pub owner: UserId,
    /// Human-readable name.
    pub name: String,
    /// Nodes in editor order.
    pub nodes: Vec<NodeSpec>,
    /// Edges in editor order.
    pub edges: Vec<Edge>,
    /// When this flow was created.
    pub created_at: DateTime<Utc>,
    /// When this flow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FlowDefinition {
    /// Creates a new flow definition.
    #[must_use]
    pub fn new(
        owner: UserId,
        name: impl Into<String>,
        nodes: Vec<NodeSpec>,
        edges: Vec<Edge>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FlowId::new(),
            owner,
            name: name.into(),
            nodes,
            edges,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the graph content and bumps the updated timestamp.
    pub fn update_graph(&mut self, nodes: Vec<NodeSpec>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.touch();
    }

    /// Marks the flow as updated.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Builds the validated graph for this flow.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the stored node list is structurally
    /// invalid.
    pub fn graph(&self) -> Result<FlowGraph, GraphError> {
        FlowGraph::build(&self.nodes, self.edges.clone())
    }

    /// Executes this flow against a payload.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the stored node list is structurally
    /// invalid.
    pub fn execute(&self, payload: Map<String, JsonValue>) -> Result<ExecuteResult, GraphError> {
        let graph = self.graph()?;
        Ok(engine::execute_graph(&graph, payload))
    }
}

/// Summary information about a flow (for listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Flow id.
    pub id: FlowId,
    /// Flow name.
    pub name: String,
    /// Number of nodes in the graph.
    pub node_count: usize,
    /// Number of edges in the graph.
    pub edge_count: usize,
    /// When the flow was created.
    pub created_at: DateTime<Utc>,
    /// When the flow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl From<&FlowDefinition> for FlowSummary {
    fn from(flow: &FlowDefinition) -> Self {
        Self {
            id: flow.id,
            name: flow.name.clone(),
            node_count: flow.nodes.len(),
            edge_count: flow.edges.len(),
            created_at: flow.created_at,
            updated_at: flow.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use serde_json::json;

    fn sample_flow(owner: UserId) -> FlowDefinition {
        let nodes = vec![
            NodeSpec::new(
                "t1",
                NodeKind::Trigger,
                json!({"name": "start"}).as_object().unwrap().clone(),
            ),
            NodeSpec::new(
                "a1",
                NodeKind::Action,
                json!({"name": "send_message", "text": "hi"})
                    .as_object()
                    .unwrap()
                    .clone(),
            ),
        ];
        FlowDefinition::new(owner, "Greeting", nodes, vec![Edge::new("t1", "a1")])
    }

    #[test]
    fn definition_creation() {
        let flow = sample_flow(UserId::new());
        assert_eq!(flow.name, "Greeting");
        assert_eq!(flow.created_at, flow.updated_at);
    }

    #[test]
    fn update_graph_bumps_timestamp() {
        let mut flow = sample_flow(UserId::new());
        let created = flow.created_at;
        flow.update_graph(vec![], vec![]);
        assert!(flow.updated_at >= created);
        assert!(flow.nodes.is_empty());
    }

    #[test]
    fn definition_executes_through_the_engine() {
        let flow = sample_flow(UserId::new());
        let result = flow.execute(Map::new()).expect("execute");
        assert_eq!(result.logs.len(), 2);
        assert!(result.logs[1].contains("Action: send_message -> hi"));
    }

    #[test]
    fn summary_from_definition() {
        let flow = sample_flow(UserId::new());
        let summary = FlowSummary::from(&flow);
        assert_eq!(summary.id, flow.id);
        assert_eq!(summary.node_count, 2);
        assert_eq!(summary.edge_count, 1);
    }

    #[test]
    fn definition_serde_roundtrip() {
        let flow = sample_flow(UserId::new());
        let json = serde_json::to_string(&flow).expect("serialize");
        let parsed: FlowDefinition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(flow, parsed);
    }
}
