//! Execution trace accumulation.
//!
//! Every step the traversal engine takes is recorded as a timestamped,
//! human-readable event. Events are append-only and never reordered; the
//! rendered form returned to callers is `"[<rfc3339 timestamp>] <message>"`
//! in append order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped trace event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// When the event was recorded, in UTC.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description of the step taken.
    pub message: String,
}

impl TraceEvent {
    /// Renders the event in the log line form returned to callers.
    #[must_use]
    pub fn render(&self) -> String {
        format!("[{}] {}", self.timestamp.to_rfc3339(), self.message)
    }
}

/// Ordered, append-only log of execution events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event with a freshly captured UTC timestamp.
    pub fn record(&mut self, message: impl Into<String>) {
        self.events.push(TraceEvent {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }

    /// Returns the recorded events in append order.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Renders all events as log lines in append order.
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        self.events.iter().map(TraceEvent::render).collect()
    }

    /// Consumes the trace, returning the rendered log lines.
    #[must_use]
    pub fn into_logs(self) -> Vec<String> {
        self.events.iter().map(TraceEvent::render).collect()
    }
}
