//! In-memory flow registry.
//!
//! Stores named flow definitions keyed by [`FlowId`]. This is the
//! collaborator the surrounding service uses to load a flow before handing
//! its graph to the engine; it holds no execution state, and callers that
//! want concurrent access wrap it in whatever exclusive ownership their
//! runtime provides.

use crate::definition::{FlowDefinition, FlowSummary};
use crate::engine::ExecuteResult;
use crate::error::RegistryError;
use courier_core::{FlowId, Result, UserId};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::debug;

/// An in-memory store of flow definitions.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: HashMap<FlowId, FlowDefinition>,
}

impl FlowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a flow definition, replacing any previous version.
    ///
    /// Returns the flow id.
    pub fn save(&mut self, flow: FlowDefinition) -> FlowId {
        let flow_id = flow.id;
        debug!(flow = %flow_id, name = %flow.name, "saving flow definition");
        self.flows.insert(flow_id, flow);
        flow_id
    }

    /// Returns a flow definition by id.
    #[must_use]
    pub fn get(&self, flow_id: FlowId) -> Option<&FlowDefinition> {
        self.flows.get(&flow_id)
    }

    /// Removes a flow definition, returning it if present.
    pub fn remove(&mut self, flow_id: FlowId) -> Option<FlowDefinition> {
        self.flows.remove(&flow_id)
    }

    /// Returns the number of stored flows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Returns true if no flows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Lists summaries of a user's flows, newest first.
    #[must_use]
    pub fn list_for_owner(&self, owner: UserId) -> Vec<FlowSummary> {
        let mut summaries: Vec<FlowSummary> = self
            .flows
            .values()
            .filter(|flow| flow.owner == owner)
            .map(FlowSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Loads a flow by id and executes it against a payload.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::FlowNotFound`] if no flow is stored under
    /// the id, or [`RegistryError::MalformedFlow`] if the stored graph
    /// fails structural validation.
    pub fn execute(
        &self,
        flow_id: FlowId,
        payload: Map<String, JsonValue>,
    ) -> Result<ExecuteResult, RegistryError> {
        let Some(flow) = self.get(flow_id) else {
            return Err(RegistryError::FlowNotFound { flow_id }.into());
        };
        let result = flow
            .execute(payload)
            .map_err(|e| RegistryError::MalformedFlow {
                flow_id,
                details: e.to_string(),
            })?;
        Ok(result)
    }
}
