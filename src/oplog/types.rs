//! Operation: a persisted, already-applied action plus audit metadata.
//!
//! Operations are the unit of the per-scope append-only log. Each one is
//! created exactly once by the dispatch engine on successful reduction and
//! is immutable thereafter. Wire form (camelCase):
//!
//! ```text
//! {"action": {...}, "hash": "…", "id": "…", "index": 0,
//!  "resultingState": {...}, "skip": 0, "timestampUtcMs": 0}
//! ```
//!
//! `index` is zero-based and contiguous within its scope's log.
//! `resultingState` is the serialized scope state immediately after this
//! operation was applied; replay must reproduce it byte-for-byte.
//! `skip` marks rebase supersession: a value of `n` excludes the previous
//! `n` effective operations from the fold while keeping them in the log
//! for audit.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::action::Action;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// A single committed operation in one scope's log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// The action that was applied.
    pub action: Action,

    /// SHA-256 hex digest of the action's canonical JSON
    /// (see [`crate::hash::action_hash`]).
    pub hash: String,

    /// Unique id of this operation record.
    pub id: String,

    /// Zero-based position in this scope's log.
    pub index: u32,

    /// Serialized scope state immediately after applying the action.
    pub resulting_state: Value,

    /// Number of immediately preceding effective operations superseded by
    /// this one (0 for normal appends).
    pub skip: u32,

    /// UTC milliseconds at which the operation was committed.
    pub timestamp_utc_ms: u64,
}

impl Operation {
    /// Serialize this operation to canonical JSON bytes (sorted keys,
    /// compact, deterministic).
    ///
    /// # Errors
    /// Returns an error if serialization fails (does not happen for
    /// well-formed operations).
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        crate::hash::canonical_json(self)
    }

    /// Deserialize an operation from JSON bytes.
    ///
    /// # Errors
    /// Returns an error if the bytes are not valid JSON or do not match
    /// the operation schema.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Scope;
    use serde_json::json;

    fn operation() -> Operation {
        let action = Action::new("ADD_FILE", Scope::Global, json!({"id": "n1", "name": "budget"}))
            .with_id("a1")
            .with_timestamp(1000);
        Operation {
            hash: crate::hash::action_hash(&action).unwrap(),
            action,
            id: "op1".to_owned(),
            index: 0,
            resulting_state: json!({"nodes": [{"id": "n1"}]}),
            skip: 0,
            timestamp_utc_ms: 1001,
        }
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let value = serde_json::to_value(operation()).unwrap();
        for key in [
            "action",
            "hash",
            "id",
            "index",
            "resultingState",
            "skip",
            "timestampUtcMs",
        ] {
            assert!(value.get(key).is_some(), "missing operation key {key}");
        }
    }

    #[test]
    fn wire_roundtrip() {
        let op = operation();
        let bytes = op.to_canonical_json().unwrap();
        let back = Operation::from_json(&bytes).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn canonical_json_is_deterministic() {
        let op = operation();
        assert_eq!(
            op.to_canonical_json().unwrap(),
            op.to_canonical_json().unwrap()
        );
    }

    #[test]
    fn canonical_json_sorts_keys() {
        let text = String::from_utf8(operation().to_canonical_json().unwrap()).unwrap();
        let action = text.find("\"action\"").unwrap();
        let hash = text.find("\"hash\"").unwrap();
        let skip = text.find("\"skip\"").unwrap();
        assert!(action < hash && hash < skip, "keys must be sorted: {text}");
    }

    #[test]
    fn from_json_rejects_malformed() {
        assert!(Operation::from_json(b"{\"index\": 0}").is_err());
    }
}
