//! Replay: current state as a left-fold over the operation log.
//!
//! `state.<scope>` is only a cache. The authoritative definition is
//! `fold(reduce, initial_state, operations.<scope>)`, applied in index
//! order over the *effective* operations (those not superseded by a
//! later rebase). Replay runs the same reducers dispatch ran, with
//! emitted intents discarded, so a pure reducer reproduces the recorded
//! `hash` and `resultingState` operation-by-operation. Any divergence
//! means either a non-deterministic reducer (forbidden) or log
//! corruption, and is reported as an [`IntegrityError`].
//!
//! # Skip semantics
//!
//! An operation with `skip = n` supersedes the `n` effective operations
//! immediately before it: they are dropped from the fold but stay in
//! the log for audit. `skip` larger than the number of effective
//! predecessors clears them all.

use std::fmt;

use serde_json::Value;

use crate::dispatch::Emitter;
use crate::hash::action_hash;
use crate::model::document::Document;
use crate::model::types::Scope;
use crate::registry::Registry;

use super::types::Operation;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// The log or the state cache has diverged from the operation sequence.
///
/// Not locally recoverable: the cached scope state must not be trusted
/// until the document is repaired (full replay from operations or an
/// explicit reconciliation).
#[derive(Debug)]
pub enum IntegrityError {
    /// The document's type has no registration, so it cannot be
    /// replayed.
    UnknownDocumentType {
        /// The unregistered type name.
        document_type: String,
    },

    /// An operation's action kind has no registered reducer.
    UnknownActionKind {
        /// The document type.
        document_type: String,
        /// The scope being replayed.
        scope: Scope,
        /// The unknown action kind.
        kind: String,
    },

    /// Operation indexes are not contiguous and zero-based.
    IndexGap {
        /// The scope whose log is broken.
        scope: Scope,
        /// The index expected at this position.
        expected: u32,
        /// The index actually recorded.
        found: u32,
    },

    /// The header revision does not equal the operation-log length.
    RevisionMismatch {
        /// The scope with the mismatch.
        scope: Scope,
        /// The recorded revision.
        revision: u32,
        /// The actual log length.
        log_len: u64,
    },

    /// A recorded hash does not match the recomputed hash of its action.
    HashMismatch {
        /// The scope containing the operation.
        scope: Scope,
        /// The operation's index.
        index: u32,
    },

    /// Folding the log did not reproduce an operation's recorded
    /// `resultingState`.
    StateMismatch {
        /// The scope containing the operation.
        scope: Scope,
        /// The operation's index.
        index: u32,
    },

    /// The final fold does not equal the cached scope state.
    StateCacheDiverged {
        /// The scope whose cache diverged.
        scope: Scope,
    },

    /// A reducer rejected an already-committed action during replay.
    Replay {
        /// The scope being replayed.
        scope: Scope,
        /// The operation's index.
        index: u32,
        /// The reducer's rejection or codec failure.
        detail: String,
    },

    /// An action could not be serialized for hash recomputation.
    Serialize(serde_json::Error),
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDocumentType { document_type } => {
                write!(f, "cannot replay: document type '{document_type}' is not registered")
            }
            Self::UnknownActionKind {
                document_type,
                scope,
                kind,
            } => write!(
                f,
                "cannot replay: no reducer for action '{kind}' on '{document_type}' ({scope} scope)"
            ),
            Self::IndexGap {
                scope,
                expected,
                found,
            } => write!(
                f,
                "{scope} log indexes are not contiguous: expected {expected}, found {found}"
            ),
            Self::RevisionMismatch {
                scope,
                revision,
                log_len,
            } => write!(
                f,
                "{scope} revision is {revision} but the log has {log_len} operation(s)"
            ),
            Self::HashMismatch { scope, index } => write!(
                f,
                "recorded hash of {scope} operation {index} does not match its action's content"
            ),
            Self::StateMismatch { scope, index } => write!(
                f,
                "replaying {scope} operation {index} did not reproduce its recorded resulting state"
            ),
            Self::StateCacheDiverged { scope } => write!(
                f,
                "cached {scope} state does not equal the replayed fold.\n  \
                 To fix: rebuild the cache from the operation log before trusting it."
            ),
            Self::Replay {
                scope,
                index,
                detail,
            } => write!(
                f,
                "{scope} operation {index} was rejected during replay: {detail}"
            ),
            Self::Serialize(e) => write!(f, "failed to serialize action for hashing: {e}"),
        }
    }
}

impl std::error::Error for IntegrityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Effective operations
// ---------------------------------------------------------------------------

/// Resolve `skip` markers: the operations that participate in the fold,
/// in index order.
#[must_use]
pub fn effective_operations(operations: &[Operation]) -> Vec<&Operation> {
    let mut effective: Vec<&Operation> = Vec::with_capacity(operations.len());
    for op in operations {
        let superseded = usize::try_from(op.skip).unwrap_or(usize::MAX);
        let keep = effective.len().saturating_sub(superseded);
        effective.truncate(keep);
        effective.push(op);
    }
    effective
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Fold an operation sequence over an initial state.
///
/// Applies each effective operation's action through the registered
/// reducer, in index order, with emitted intents discarded. Strict and
/// side-effect free.
///
/// # Errors
/// Returns an error if a reducer is missing or rejects a committed
/// action.
pub fn replay(
    registry: &Registry,
    document_type: &str,
    scope: Scope,
    initial: Value,
    operations: &[Operation],
) -> Result<Value, IntegrityError> {
    let mut state = initial;
    for op in effective_operations(operations) {
        apply(registry, document_type, scope, &mut state, op)?;
    }
    Ok(state)
}

/// Fold one scope of a document from its type's registered initial
/// state.
///
/// # Errors
/// Returns an error if the document type is unregistered or replay
/// fails.
pub fn replay_scope(
    registry: &Registry,
    document: &Document,
    scope: Scope,
) -> Result<Value, IntegrityError> {
    let document_type = &document.header.document_type;
    let initial = registry
        .initial_state(document_type, scope)
        .ok_or_else(|| IntegrityError::UnknownDocumentType {
            document_type: document_type.clone(),
        })?
        .clone();
    replay(
        registry,
        document_type,
        scope,
        initial,
        document.operations_of(scope),
    )
}

fn apply(
    registry: &Registry,
    document_type: &str,
    scope: Scope,
    state: &mut Value,
    op: &Operation,
) -> Result<(), IntegrityError> {
    let registered = registry
        .action(document_type, scope, &op.action.kind)
        .ok_or_else(|| IntegrityError::UnknownActionKind {
            document_type: document_type.to_owned(),
            scope,
            kind: op.action.kind.clone(),
        })?;
    // Replay discards emissions: reducers must be pure and the fold has
    // no side-effect channel.
    let mut emitter = Emitter::new();
    registered
        .apply(state, &op.action.input, &mut emitter)
        .map_err(|e| IntegrityError::Replay {
            scope,
            index: op.index,
            detail: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a document against its own operation logs.
///
/// Checks, per scope: index contiguity, revision consistency, recorded
/// hash vs recomputed hash for every operation, recorded
/// `resultingState` vs the recomputed fold at every effective step, and
/// the final fold vs the cached scope state.
///
/// # Errors
/// Returns the first [`IntegrityError`] encountered.
pub fn verify_document(registry: &Registry, document: &Document) -> Result<(), IntegrityError> {
    let document_type = &document.header.document_type;
    for scope in Scope::ALL {
        let operations = document.operations_of(scope);

        for (position, op) in operations.iter().enumerate() {
            let expected = u32::try_from(position).unwrap_or(u32::MAX);
            if op.index != expected {
                return Err(IntegrityError::IndexGap {
                    scope,
                    expected,
                    found: op.index,
                });
            }
        }

        let log_len = u64::try_from(operations.len()).unwrap_or(u64::MAX);
        if u64::from(document.revision_of(scope)) != log_len {
            return Err(IntegrityError::RevisionMismatch {
                scope,
                revision: document.revision_of(scope),
                log_len,
            });
        }

        for op in operations {
            let recomputed = action_hash(&op.action).map_err(IntegrityError::Serialize)?;
            if recomputed != op.hash {
                return Err(IntegrityError::HashMismatch {
                    scope,
                    index: op.index,
                });
            }
        }

        let initial = registry
            .initial_state(document_type, scope)
            .ok_or_else(|| IntegrityError::UnknownDocumentType {
                document_type: document_type.clone(),
            })?
            .clone();
        let mut state = initial;
        for op in effective_operations(operations) {
            apply(registry, document_type, scope, &mut state, op)?;
            if state != op.resulting_state {
                return Err(IntegrityError::StateMismatch {
                    scope,
                    index: op.index,
                });
            }
        }

        if &state != document.state_of(scope) {
            return Err(IntegrityError::StateCacheDiverged { scope });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
