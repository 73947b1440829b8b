//! Flow graph execution engine for the courier platform.
//!
//! This crate interprets user-authored automation graphs:
//!
//! - **Graph Model**: validated, indexed graphs of typed nodes and edges
//! - **Node Kinds**: Trigger, Condition, Action (with typed configs and a
//!   forward-compatible fallback for unknown actions)
//! - **Expression Evaluator**: closed-grammar condition evaluation over
//!   the execution context, no arbitrary code execution
//! - **Traversal Engine**: single-path, synchronous interpretation with
//!   cycle protection
//! - **Execution Trace**: ordered, timestamped log returned to the caller
//! - **Definitions & Registry**: named flows and an in-memory store

pub mod definition;
pub mod edge;
pub mod engine;
pub mod error;
pub mod expr;
pub mod graph;
pub mod node;
pub mod registry;
pub mod trace;

pub use definition::{FlowDefinition, FlowSummary};
pub use edge::Edge;
pub use engine::{ExecuteRequest, ExecuteResult, execute, execute_graph};
pub use error::{EvalError, GraphError, RegistryError};
pub use expr::evaluate;
pub use graph::FlowGraph;
pub use node::{ActionConfig, Node, NodeConfig, NodeId, NodeKind, NodeSpec};
pub use registry::FlowRegistry;
pub use trace::{ExecutionTrace, TraceEvent};
