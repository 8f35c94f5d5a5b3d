//! Dispatch engine: validate, reduce, commit.
//!
//! `dispatch` is the only way a document changes. The pipeline:
//!
//! 1. Resolve the registered handler for
//!    (document type, action scope, action kind). Unknown type or kind
//!    is rejected before anything else.
//! 2. Run the registered schema check against the action input. A
//!    violation returns the document byte-for-byte unchanged.
//! 3. Clone the target scope state into an owned draft and run the
//!    reducer against it. A domain rejection discards the draft; the
//!    document is unchanged. Dispatch is all-or-nothing.
//! 4. On success: compute the action's content hash, append a new
//!    [`Operation`] with the next index, swap the draft in as the scope
//!    state cache, bump the scope revision, and refresh the header's
//!    last-modified timestamp.
//!
//! Reducers may request follow-up actions against other documents by
//! pushing [`IntentCommand`]s into the [`Emitter`]. These are returned
//! to the caller as plain data and are never dispatched recursively
//! inline; ordering relative to the triggering operation is "at least
//! after", not synchronous (see [`crate::relay`]).

use std::fmt;

use serde_json::Value;

use crate::hash::action_hash;
use crate::model::action::Action;
use crate::model::document::Document;
use crate::model::types::{fresh_id, now_utc_iso, now_utc_ms, DocumentId, Scope};
use crate::oplog::types::Operation;
use crate::registry::{DomainError, ReduceFailure, Registry, SchemaViolation};

// ---------------------------------------------------------------------------
// Intents
// ---------------------------------------------------------------------------

/// A follow-up action requested by a reducer, targeting some document
/// (usually a different one). Plain data; applied later by the relay.
#[derive(Clone, Debug, PartialEq)]
pub struct IntentCommand {
    /// The document the follow-up action targets.
    pub document_id: DocumentId,
    /// The follow-up action itself.
    pub action: Action,
}

/// Collects the intents a reducer emits during a single dispatch.
#[derive(Debug, Default)]
pub struct Emitter {
    pending: Vec<IntentCommand>,
}

impl Emitter {
    /// Create an empty emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a follow-up action against a target document.
    pub fn emit(&mut self, document_id: DocumentId, action: Action) {
        self.pending.push(IntentCommand {
            document_id,
            action,
        });
    }

    /// Returns `true` if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Consume the emitter, yielding the collected intents in emission
    /// order.
    #[must_use]
    pub fn into_pending(self) -> Vec<IntentCommand> {
        self.pending
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a dispatch was rejected. Every variant leaves the document
/// exactly as it was.
#[derive(Debug)]
pub enum DispatchError {
    /// The document's type has no registration.
    UnknownDocumentType {
        /// The unregistered type name.
        document_type: String,
    },

    /// No reducer is registered for this (type, scope, kind).
    UnknownActionKind {
        /// The document type.
        document_type: String,
        /// The scope the action targeted.
        scope: Scope,
        /// The unknown action kind.
        kind: String,
    },

    /// The action input failed the registered schema check.
    Schema(SchemaViolation),

    /// The reducer rejected the transition.
    Domain(DomainError),

    /// The draft state or action input did not round-trip through the
    /// registered reducer's types.
    Codec {
        /// What failed to encode or decode.
        detail: String,
    },

    /// The action could not be serialized for hashing.
    Serialize(serde_json::Error),

    /// The scope's operation log is at the index limit.
    LogFull {
        /// The scope whose log is full.
        scope: Scope,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDocumentType { document_type } => {
                write!(
                    f,
                    "document type '{document_type}' is not registered.\n  \
                     To fix: register the type before dispatching against it."
                )
            }
            Self::UnknownActionKind {
                document_type,
                scope,
                kind,
            } => write!(
                f,
                "no reducer registered for action '{kind}' on '{document_type}' ({scope} scope)"
            ),
            Self::Schema(v) => write!(f, "{v}"),
            Self::Domain(e) => write!(f, "{e}"),
            Self::Codec { detail } => write!(f, "reducer codec failure: {detail}"),
            Self::Serialize(e) => write!(f, "failed to serialize action for hashing: {e}"),
            Self::LogFull { scope } => {
                write!(f, "operation log for {scope} scope reached the index limit")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Schema(v) => Some(v),
            Self::Domain(e) => Some(e),
            Self::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaViolation> for DispatchError {
    fn from(v: SchemaViolation) -> Self {
        Self::Schema(v)
    }
}

impl From<ReduceFailure> for DispatchError {
    fn from(failure: ReduceFailure) -> Self {
        match failure {
            ReduceFailure::Domain(e) => Self::Domain(e),
            ReduceFailure::Codec { detail } => Self::Codec { detail },
        }
    }
}

// ---------------------------------------------------------------------------
// dispatch
// ---------------------------------------------------------------------------

/// Validate an action and, on success, commit it to the document's
/// operation log.
///
/// Mutates the document only on success; every error path leaves it
/// untouched. Returns the intents the reducer emitted, in emission
/// order, for the caller (or the relay) to apply independently.
///
/// # Errors
/// See [`DispatchError`]; all variants are atomic rejections.
pub fn dispatch(
    registry: &Registry,
    document: &mut Document,
    action: Action,
) -> Result<Vec<IntentCommand>, DispatchError> {
    let document_type = document.header.document_type.clone();
    if !registry.has_document_type(&document_type) {
        return Err(DispatchError::UnknownDocumentType { document_type });
    }

    let scope = action.scope;
    let registered = registry
        .action(&document_type, scope, &action.kind)
        .ok_or_else(|| DispatchError::UnknownActionKind {
            document_type: document_type.clone(),
            scope,
            kind: action.kind.clone(),
        })?;

    // Schema validation runs strictly before any reducer executes.
    registered.check_schema(&action.input)?;

    // Owned draft: the reducer gets exclusive, temporary ownership and
    // the document is only touched once the reducer has succeeded.
    let mut draft: Value = document.state_of(scope).clone();
    let mut emitter = Emitter::new();
    registered.apply(&mut draft, &action.input, &mut emitter)?;

    let index = u32::try_from(document.operations_of(scope).len())
        .map_err(|_| DispatchError::LogFull { scope })?;
    let hash = action_hash(&action).map_err(DispatchError::Serialize)?;

    let operation = Operation {
        action,
        hash,
        id: fresh_id(),
        index,
        resulting_state: draft.clone(),
        skip: 0,
        timestamp_utc_ms: now_utc_ms(),
    };

    document.operations.of_mut(scope).push(operation);
    *document.state_of_mut(scope) = draft;
    document.header.revision.bump(scope);
    document.header.last_modified_at_utc_iso = now_utc_iso();

    Ok(emitter.into_pending())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
