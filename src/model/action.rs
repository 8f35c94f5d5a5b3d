//! Action: an immutable request to change one scope of a document.
//!
//! Actions are created by callers and never mutated. The dispatch engine
//! validates an action's input against the schema registered for its kind,
//! runs the matching reducer, and on success records the action inside a
//! new operation. Wire form (camelCase):
//! `{"id": "…", "input": {…}, "scope": "global", "timestampUtcMs": 0, "type": "ADD_FILE"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{fresh_id, now_utc_ms, Scope};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// An immutable command description targeting one scope of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Unique id of this action instance.
    pub id: String,

    /// Arbitrary JSON payload; shape is checked by the registered schema
    /// predicate before any reducer runs.
    pub input: Value,

    /// The state partition this action targets.
    pub scope: Scope,

    /// UTC milliseconds at which the caller created the action.
    pub timestamp_utc_ms: u64,

    /// The action kind, matched against the reducer registry
    /// (for example `ADD_FILE`).
    #[serde(rename = "type")]
    pub kind: String,
}

impl Action {
    /// Build a new action with a fresh id and the current timestamp.
    #[must_use]
    pub fn new(kind: impl Into<String>, scope: Scope, input: Value) -> Self {
        Self {
            id: fresh_id(),
            input,
            scope,
            timestamp_utc_ms: now_utc_ms(),
            kind: kind.into(),
        }
    }

    /// Replace the creation timestamp (deterministic construction).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp_utc_ms: u64) -> Self {
        self.timestamp_utc_ms = timestamp_utc_ms;
        self
    }

    /// Replace the action id (deterministic construction).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
