//! Intent relay: applies reducer-emitted follow-up actions.
//!
//! Reducers never dispatch against other documents directly; they emit
//! [`IntentCommand`]s as plain data. This module is the scheduler that
//! consumes them: each intent is loaded, dispatched, and saved
//! independently, so one failing intent neither aborts the batch nor
//! affects the dispatch that emitted it. Nested emissions are followed
//! breadth-first. Ordering is "at least after" the triggering
//! operation; nothing here is synchronous with it, and nothing is
//! retried.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, warn};

use crate::dispatch::{dispatch, DispatchError, IntentCommand};
use crate::model::types::DocumentId;
use crate::registry::Registry;
use crate::storage::{DocumentStore, StorageError};

// ---------------------------------------------------------------------------
// Error and report types
// ---------------------------------------------------------------------------

/// Why a single intent failed to apply.
#[derive(Debug)]
pub enum RelayError {
    /// Loading or saving the target document failed.
    Storage(StorageError),
    /// The target document rejected the action.
    Dispatch(DispatchError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "{e}"),
            Self::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Dispatch(e) => Some(e),
        }
    }
}

/// One intent that could not be applied.
#[derive(Debug)]
pub struct RelayFailure {
    /// The document the intent targeted.
    pub document_id: DocumentId,
    /// The action kind of the failed intent.
    pub kind: String,
    /// What went wrong.
    pub error: RelayError,
}

/// The outcome of draining a batch of intents.
#[derive(Debug, Default)]
pub struct RelayReport {
    /// Number of intents applied and saved.
    pub applied: usize,
    /// Intents that failed, in encounter order.
    pub failures: Vec<RelayFailure>,
}

impl RelayReport {
    /// Returns `true` if every intent applied cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// drain
// ---------------------------------------------------------------------------

/// Apply a batch of intents against storage, following nested emissions
/// breadth-first.
///
/// Failures are recorded in the report (and logged at `warn`) without
/// stopping the drain; retry is the caller's decision.
pub fn drain(
    store: &DocumentStore,
    registry: &Registry,
    intents: Vec<IntentCommand>,
) -> RelayReport {
    let mut report = RelayReport::default();
    let mut queue: VecDeque<IntentCommand> = intents.into();

    while let Some(intent) = queue.pop_front() {
        let kind = intent.action.kind.clone();
        match apply_intent(store, registry, intent) {
            Ok((document_id, nested)) => {
                debug!(document = %document_id, kind = %kind, "applied intent");
                report.applied += 1;
                queue.extend(nested);
            }
            Err((document_id, error)) => {
                warn!(document = %document_id, kind = %kind, error = %error, "intent failed");
                report.failures.push(RelayFailure {
                    document_id,
                    kind,
                    error,
                });
            }
        }
    }
    report
}

type IntentOutcome = Result<(DocumentId, Vec<IntentCommand>), (DocumentId, RelayError)>;

fn apply_intent(store: &DocumentStore, registry: &Registry, intent: IntentCommand) -> IntentOutcome {
    let IntentCommand {
        document_id,
        action,
    } = intent;

    let mut document = match store.load(&document_id) {
        Ok(document) => document,
        Err(e) => return Err((document_id, RelayError::Storage(e))),
    };
    let loaded_revision = document.header.revision;

    let nested = match dispatch(registry, &mut document, action) {
        Ok(nested) => nested,
        Err(e) => return Err((document_id, RelayError::Dispatch(e))),
    };

    match store.save(&document, &loaded_revision) {
        Ok(()) => Ok((document_id, nested)),
        Err(e) => Err((document_id, RelayError::Storage(e))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
