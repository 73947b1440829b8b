//! Flow node types and configurations.
//!
//! Nodes arrive from the flow editor as loosely-typed maps ([`NodeSpec`]).
//! At graph construction they are lowered into [`Node`]s carrying a typed
//! [`NodeConfig`] per kind, with a generic fallback for action names the
//! engine does not know about.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Identifier for a node within a flow graph.
///
/// Unlike the platform-wide ULID ids, node ids are opaque strings chosen by
/// whoever authored the flow (the editor typically uses short labels such as
/// `"t1"`). They must be non-empty and unique within one graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of a flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point of a traversal.
    Trigger,
    /// Gate that evaluates an expression against the context.
    Condition,
    /// A simulated effect; real delivery happens outside the engine.
    Action,
}

/// Wire shape of a node as submitted by the caller.
///
/// `config` semantics depend on `kind`; unknown keys (the editor stores
/// layout coordinates such as `x`/`y` alongside real configuration) are
/// carried but ignored. The `type` alias accepts graphs authored against
/// the legacy backend, which used that field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Caller-chosen node id, unique within the graph.
    pub id: NodeId,
    /// The node kind.
    #[serde(alias = "type")]
    pub kind: NodeKind,
    /// Kind-specific configuration.
    #[serde(default)]
    pub config: Map<String, JsonValue>,
}

impl NodeSpec {
    /// Creates a node spec.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind, config: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            kind,
            config,
        }
    }
}

/// Typed configuration for an action node.
///
/// `SetValue` is the one action with a context-mutation contract: it writes
/// `value` at `key` in the execution context. Every other action only
/// records what it would have done; real effects are performed by external
/// collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Record that a message send was requested.
    SendMessage {
        /// The message text.
        text: String,
    },
    /// A simulated wait. The engine never actually pauses.
    Delay {
        /// Requested duration in milliseconds.
        ms: u64,
    },
    /// Write a value into the execution context.
    #[serde(rename = "set")]
    SetValue {
        /// Context key to write.
        key: String,
        /// Value to store under the key.
        value: JsonValue,
    },
    /// Forward-compatible fallback for unrecognized action names.
    #[serde(untagged)]
    Other {
        /// The action name as submitted.
        name: String,
        /// The raw configuration map, preserved as-is.
        params: Map<String, JsonValue>,
    },
}

impl ActionConfig {
    /// Returns the action name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::SendMessage { .. } => "send_message",
            Self::Delay { .. } => "delay",
            Self::SetValue { .. } => "set",
            Self::Other { name, .. } => name,
        }
    }
}

/// Typed configuration for a node, varying by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeConfig {
    /// Trigger configuration.
    Trigger {
        /// Display name recorded in the trace.
        name: String,
    },
    /// Condition configuration.
    Condition {
        /// Boolean expression evaluated against the context.
        expr: String,
    },
    /// Action configuration.
    Action(ActionConfig),
}

impl NodeConfig {
    /// Returns the kind of node this configuration belongs to.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Trigger { .. } => NodeKind::Trigger,
            Self::Condition { .. } => NodeKind::Condition,
            Self::Action(_) => NodeKind::Action,
        }
    }
}

/// A flow node with its typed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the flow graph.
    pub id: NodeId,
    /// Typed configuration (determines kind and behavior).
    pub config: NodeConfig,
}

impl Node {
    /// Lowers a wire-shaped spec into a typed node.
    ///
    /// Lowering is permissive: missing or mistyped config fields fall back
    /// to the documented defaults (`"start"`, `"true"`, `"noop"`) instead
    /// of failing, matching the interactive authoring model.
    #[must_use]
    pub fn from_spec(spec: &NodeSpec) -> Self {
        let config = match spec.kind {
            NodeKind::Trigger => NodeConfig::Trigger {
                name: str_field(&spec.config, "name").unwrap_or("start").to_string(),
            },
            NodeKind::Condition => NodeConfig::Condition {
                expr: str_field(&spec.config, "expr").unwrap_or("true").to_string(),
            },
            NodeKind::Action => NodeConfig::Action(action_from_config(&spec.config)),
        };
        Self {
            id: spec.id.clone(),
            config,
        }
    }

    /// Returns the kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

fn str_field<'a>(config: &'a Map<String, JsonValue>, key: &str) -> Option<&'a str> {
    config.get(key).and_then(JsonValue::as_str)
}

fn action_from_config(config: &Map<String, JsonValue>) -> ActionConfig {
    let name = str_field(config, "name").unwrap_or("noop");
    match name {
        "send_message" => ActionConfig::SendMessage {
            text: str_field(config, "text").unwrap_or_default().to_string(),
        },
        "delay" => ActionConfig::Delay {
            ms: config
                .get("ms")
                .and_then(JsonValue::as_u64)
                .unwrap_or_default(),
        },
        // A `set` without a key cannot honor its mutation contract, so it
        // degrades to the generic fallback.
        "set" if str_field(config, "key").is_some() => ActionConfig::SetValue {
            key: str_field(config, "key").unwrap_or_default().to_string(),
            value: config.get("value").cloned().unwrap_or(JsonValue::Null),
        },
        other => ActionConfig::Other {
            name: other.to_string(),
            params: config.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn trigger_lowering_uses_default_name() {
        let spec = NodeSpec::new("t1", NodeKind::Trigger, Map::new());
        let node = Node::from_spec(&spec);
        assert_eq!(
            node.config,
            NodeConfig::Trigger {
                name: "start".to_string()
            }
        );
    }

    #[test]
    fn condition_lowering_uses_default_expr() {
        let spec = NodeSpec::new("c1", NodeKind::Condition, Map::new());
        let node = Node::from_spec(&spec);
        assert_eq!(
            node.config,
            NodeConfig::Condition {
                expr: "true".to_string()
            }
        );
    }

    #[test]
    fn send_message_action_lowering() {
        let spec = NodeSpec::new(
            "a1",
            NodeKind::Action,
            config(json!({"name": "send_message", "text": "Welcome"})),
        );
        let node = Node::from_spec(&spec);
        assert_eq!(
            node.config,
            NodeConfig::Action(ActionConfig::SendMessage {
                text: "Welcome".to_string()
            })
        );
    }

    #[test]
    fn delay_action_defaults_to_zero_ms() {
        let spec = NodeSpec::new("a1", NodeKind::Action, config(json!({"name": "delay"})));
        let node = Node::from_spec(&spec);
        assert_eq!(node.config, NodeConfig::Action(ActionConfig::Delay { ms: 0 }));
    }

    #[test]
    fn set_action_without_key_falls_back_to_other() {
        let spec = NodeSpec::new(
            "a1",
            NodeKind::Action,
            config(json!({"name": "set", "value": 1})),
        );
        let node = Node::from_spec(&spec);
        let NodeConfig::Action(action) = &node.config else {
            panic!("expected action config");
        };
        assert_eq!(action.name(), "set");
        assert!(matches!(action, ActionConfig::Other { .. }));
    }

    #[test]
    fn unknown_action_preserves_params() {
        let spec = NodeSpec::new(
            "a1",
            NodeKind::Action,
            config(json!({"name": "webhook", "url": "https://example.com"})),
        );
        let node = Node::from_spec(&spec);
        let NodeConfig::Action(ActionConfig::Other { name, params }) = &node.config else {
            panic!("expected fallback action");
        };
        assert_eq!(name, "webhook");
        assert_eq!(params.get("url"), Some(&json!("https://example.com")));
    }

    #[test]
    fn action_without_name_is_noop() {
        let spec = NodeSpec::new("a1", NodeKind::Action, Map::new());
        let node = Node::from_spec(&spec);
        let NodeConfig::Action(action) = &node.config else {
            panic!("expected action config");
        };
        assert_eq!(action.name(), "noop");
    }

    #[test]
    fn node_spec_accepts_legacy_type_field() {
        let spec: NodeSpec =
            serde_json::from_value(json!({"id": "t1", "type": "trigger"})).expect("deserialize");
        assert_eq!(spec.kind, NodeKind::Trigger);
        assert!(spec.config.is_empty());
    }

    #[test]
    fn node_spec_tolerates_layout_keys() {
        let spec: NodeSpec = serde_json::from_value(json!({
            "id": "c1",
            "kind": "condition",
            "config": {"expr": "ctx.ok", "x": 120, "y": 40}
        }))
        .expect("deserialize");
        let node = Node::from_spec(&spec);
        assert_eq!(
            node.config,
            NodeConfig::Condition {
                expr: "ctx.ok".to_string()
            }
        );
    }

    #[test]
    fn node_spec_serde_roundtrip() {
        let spec = NodeSpec::new(
            "a1",
            NodeKind::Action,
            config(json!({"name": "delay", "ms": 500})),
        );
        let json = serde_json::to_string(&spec).expect("serialize");
        let parsed: NodeSpec = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(spec, parsed);
    }
}
