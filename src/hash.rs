//! Content hashing over canonical JSON.
//!
//! Every committed operation records a SHA-256 digest of its action's
//! canonicalized payload, so replay and audit tooling can detect whether
//! the recorded action still matches its original content.
//!
//! Canonical JSON rules:
//! - Sorted object keys. `serde_json`'s default `Map` is backed by a
//!   `BTreeMap`, so serializing through `serde_json::Value` yields sorted
//!   keys regardless of struct field declaration order.
//! - No insignificant whitespace (compact form).
//! - Deterministic: serialize twice, get identical bytes.
//!
//! Hashes are per-operation and cover only the current action's payload;
//! they are not chained to a predecessor hash. Detecting insertion or
//! removal of whole operations is the job of index contiguity and full
//! replay verification, not of the per-operation digest.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::action::Action;

// ---------------------------------------------------------------------------
// Canonical JSON
// ---------------------------------------------------------------------------

/// Serialize a value to canonical JSON bytes.
///
/// The value is first converted to a `serde_json::Value` so object keys
/// pass through the sorted map representation, then serialized compactly.
///
/// # Errors
/// Returns an error if the value cannot be represented as JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_vec(&value)
}

// ---------------------------------------------------------------------------
// Action hash
// ---------------------------------------------------------------------------

/// Compute the content hash of an action: SHA-256 over its canonical
/// JSON, rendered as 64 lowercase hex characters.
///
/// # Errors
/// Returns an error if the action cannot be serialized (does not happen
/// for well-formed actions).
pub fn action_hash(action: &Action) -> Result<String, serde_json::Error> {
    let bytes = canonical_json(action)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(to_hex(&hasher.finalize()))
}

/// Render a digest as a lowercase hex string.
fn to_hex(digest: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut hex = String::with_capacity(digest.len() * 2);
    for b in digest {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
