//! The traversal engine.
//!
//! One execution call interprets a graph synchronously: build and validate,
//! select start nodes (every trigger in input order, or the first node when
//! the graph has no trigger), then walk each path one node at a time. The
//! context and trace are shared across all start nodes of a call, so a
//! mutation made on one trigger's path is visible to the next.
//!
//! Per path, the engine is a small state machine: `Running` advances along
//! the first matching outgoing edge, `Blocked` means a condition failed or
//! the current id resolved to nothing, `Halted` means a node was about to
//! be revisited (cycle), and `Done` means the path ran off the end of the
//! graph. Only structural validation can fail the call; everything a path
//! runs into is absorbed into the trace.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::expr;
use crate::graph::FlowGraph;
use crate::node::{ActionConfig, Node, NodeConfig, NodeId, NodeKind, NodeSpec};
use crate::trace::ExecutionTrace;
use courier_core::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use tracing::{debug, debug_span};

/// A request to execute a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Nodes in input order.
    pub nodes: Vec<NodeSpec>,
    /// Edges in input order.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Initial context, defaults to empty.
    #[serde(default)]
    pub payload: Map<String, JsonValue>,
}

/// The result of one execution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Rendered trace lines in traversal order.
    pub logs: Vec<String>,
    /// Final context: the payload plus any action-induced mutations.
    pub context: Map<String, JsonValue>,
}

/// State of a single start-node traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathState {
    /// Traversal is at the node with this id.
    Running(NodeId),
    /// A condition failed, or the current id resolved to no node.
    Blocked,
    /// A node was about to be revisited; halted to guarantee termination.
    Halted,
    /// The path ran out of outgoing edges.
    Done,
}

/// Whether a step allows the path to advance.
enum StepControl {
    Continue,
    Stop,
}

/// Executes a flow graph from caller-submitted nodes, edges, and payload.
///
/// # Errors
///
/// Returns a [`GraphError`] if the node list is structurally invalid
/// (empty or duplicate ids). Runtime anomalies never fail the call; they
/// are recorded in the returned logs.
pub fn execute(request: ExecuteRequest) -> Result<ExecuteResult, GraphError> {
    let ExecuteRequest {
        nodes,
        edges,
        payload,
    } = request;
    let graph = FlowGraph::build(&nodes, edges)?;
    Ok(execute_graph(&graph, payload))
}

/// Executes a previously built graph against a payload.
#[must_use]
pub fn execute_graph(graph: &FlowGraph, payload: Map<String, JsonValue>) -> ExecuteResult {
    let execution_id = ExecutionId::new();
    let span = debug_span!("flow_execution", execution = %execution_id);
    let _guard = span.enter();

    let mut context = payload;
    let mut trace = ExecutionTrace::new();

    let start_ids = start_nodes(graph);
    debug!(start_count = start_ids.len(), "selected start nodes");

    for start in &start_ids {
        let outcome = run_path(graph, start, &mut context, &mut trace);
        debug!(start = %start, ?outcome, "path finished");
    }

    ExecuteResult {
        logs: trace.into_logs(),
        context,
    }
}

/// Selects start nodes: all triggers in input order, or the first node of
/// the submitted list when the graph has no trigger.
fn start_nodes(graph: &FlowGraph) -> Vec<NodeId> {
    let triggers: Vec<NodeId> = graph
        .nodes_by_kind(NodeKind::Trigger)
        .map(|node| node.id.clone())
        .collect();
    if !triggers.is_empty() {
        return triggers;
    }
    graph.nodes().take(1).map(|node| node.id.clone()).collect()
}

/// Walks one path from a start node until it terminates.
///
/// The returned state is always terminal. Each path gets its own visited
/// set, so two triggers may walk through the same node within one call.
fn run_path(
    graph: &FlowGraph,
    start: &NodeId,
    context: &mut Map<String, JsonValue>,
    trace: &mut ExecutionTrace,
) -> PathState {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut state = PathState::Running(start.clone());

    loop {
        let current = match state {
            PathState::Running(id) => id,
            terminal => return terminal,
        };

        if !visited.insert(current.clone()) {
            debug!(node = %current, "node revisited, halting path");
            return PathState::Halted;
        }

        let Some(node) = graph.node(&current) else {
            debug!(node = %current, "current id resolves to no node, blocking path");
            return PathState::Blocked;
        };

        if let StepControl::Stop = step(node, context, trace) {
            return PathState::Blocked;
        }

        state = match graph.first_edge_from(&current) {
            Some(edge) => PathState::Running(edge.to.clone()),
            None => PathState::Done,
        };
    }
}

/// Applies one node's semantics: record a trace event, mutate the context
/// where the action's contract says so, and report whether to advance.
fn step(
    node: &Node,
    context: &mut Map<String, JsonValue>,
    trace: &mut ExecutionTrace,
) -> StepControl {
    match &node.config {
        NodeConfig::Trigger { name } => {
            trace.record(format!("Trigger: {name}"));
            StepControl::Continue
        }
        NodeConfig::Condition { expr } => match expr::evaluate(expr, context) {
            Ok(true) => {
                trace.record(format!("Condition '{expr}' -> true"));
                StepControl::Continue
            }
            Ok(false) => {
                trace.record(format!("Condition '{expr}' -> false"));
                StepControl::Stop
            }
            Err(reason) => {
                trace.record(format!("Condition '{expr}' failed to evaluate: {reason}"));
                StepControl::Stop
            }
        },
        NodeConfig::Action(action) => {
            match action {
                ActionConfig::SendMessage { text } => {
                    trace.record(format!("Action: send_message -> {text}"));
                }
                ActionConfig::Delay { ms } => {
                    // Simulated only: the engine records the wait and moves on.
                    trace.record(format!("Action: delay {ms}ms (simulated)"));
                }
                ActionConfig::SetValue { key, value } => {
                    context.insert(key.clone(), value.clone());
                    trace.record(format!("Action: set {key}"));
                }
                ActionConfig::Other { name, .. } => {
                    trace.record(format!("Action: {name}"));
                }
            }
            StepControl::Continue
        }
    }
}
