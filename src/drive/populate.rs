//! Drive population: the maintenance procedure that seeds a drive with
//! one document per candidate type.
//!
//! For each candidate `{name, document_type}`:
//!
//! - skip if the drive already has a node with that name (idempotence:
//!   running the procedure twice changes nothing the second time);
//! - otherwise create a fresh child document with empty operation logs,
//!   dispatch `ADD_FILE` against the drive, and record the child id in
//!   the manifest.
//!
//! The drive and manifest are saved once at the end, with the drive
//! save guarded by the revision captured at load. A conflict means an
//! external writer advanced the drive mid-run; the error propagates and
//! the caller decides whether to re-run (safe, because of the name
//! check).

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use crate::dispatch::{dispatch, DispatchError};
use crate::model::action::Action;
use crate::model::document::{Document, Revision};
use crate::model::types::{DocumentId, NodeId, Scope};
use crate::registry::{Registry, RegistryError};
use crate::storage::{DocumentStore, StorageError};

use super::actions::{AddFileInput, ADD_FILE};
use super::types::{DriveState, DRIVE_DOCUMENT_TYPE};

// ---------------------------------------------------------------------------
// Inputs and report
// ---------------------------------------------------------------------------

/// One entry of the candidate list driving population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopulateCandidate {
    /// Display name of the node to create (also the idempotence key).
    pub name: String,
    /// Document type of the child document.
    pub document_type: String,
}

/// A child document created during population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedDocument {
    /// The candidate name.
    pub name: String,
    /// The created document's id.
    pub document_id: DocumentId,
}

/// What a population run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Documents created this run, in candidate order.
    pub created: Vec<CreatedDocument>,
    /// Candidate names skipped because a node already carried them.
    pub skipped: Vec<String>,
}

impl PopulateReport {
    /// Returns `true` if the run created nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.created.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised by the populate procedure.
#[derive(Debug)]
pub enum PopulateError {
    /// Loading or saving a document, or the manifest, failed.
    Storage(StorageError),
    /// Dispatching `ADD_FILE` against the drive failed.
    Dispatch(DispatchError),
    /// A candidate document type is not registered.
    Registry(RegistryError),
    /// The drive's global state does not decode as drive state.
    DriveState {
        /// Decode error detail.
        detail: String,
    },
    /// The loaded document is not a drive.
    NotADrive {
        /// The document's actual type.
        document_type: String,
    },
}

impl fmt::Display for PopulateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "{e}"),
            Self::Dispatch(e) => write!(f, "failed to record drive node: {e}"),
            Self::Registry(e) => write!(f, "{e}"),
            Self::DriveState { detail } => {
                write!(f, "drive global state is malformed: {detail}")
            }
            Self::NotADrive { document_type } => write!(
                f,
                "expected a '{DRIVE_DOCUMENT_TYPE}' document, found '{document_type}'"
            ),
        }
    }
}

impl std::error::Error for PopulateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Dispatch(e) => Some(e),
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for PopulateError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<DispatchError> for PopulateError {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<RegistryError> for PopulateError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// ensure_drive
// ---------------------------------------------------------------------------

/// Load the drive document, creating and saving a fresh one under the
/// given id if none exists yet.
///
/// # Errors
/// Returns an error on storage failure or if the stored document is not
/// a drive.
pub fn ensure_drive(
    store: &DocumentStore,
    registry: &Registry,
    drive_id: &DocumentId,
    slug: &str,
) -> Result<Document, PopulateError> {
    match store.load(drive_id) {
        Ok(document) => {
            if document.header.document_type == DRIVE_DOCUMENT_TYPE {
                Ok(document)
            } else {
                Err(PopulateError::NotADrive {
                    document_type: document.header.document_type,
                })
            }
        }
        Err(StorageError::NotFound { .. }) => {
            let drive = registry
                .create_document(DRIVE_DOCUMENT_TYPE)?
                .with_id(drive_id.clone())
                .with_slug(slug);
            store.save(&drive, &Revision::ZERO)?;
            info!(id = %drive_id, "created drive document");
            Ok(drive)
        }
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// populate
// ---------------------------------------------------------------------------

/// Run the population procedure against a stored drive.
///
/// # Errors
/// Returns an error on storage, dispatch, or registry failure. A
/// [`StorageError::RevisionConflict`] on the final drive save means an
/// external writer advanced the drive during the run; re-running after
/// that is safe.
pub fn populate(
    store: &DocumentStore,
    registry: &Registry,
    drive_id: &DocumentId,
    candidates: &[PopulateCandidate],
) -> Result<PopulateReport, PopulateError> {
    let mut drive = store.load(drive_id)?;
    if drive.header.document_type != DRIVE_DOCUMENT_TYPE {
        return Err(PopulateError::NotADrive {
            document_type: drive.header.document_type,
        });
    }
    let loaded_revision = drive.header.revision;
    let mut manifest = store.load_manifest()?;

    let state: DriveState = serde_json::from_value(drive.state.global.clone()).map_err(|e| {
        PopulateError::DriveState {
            detail: e.to_string(),
        }
    })?;
    let mut names: BTreeSet<String> = state.nodes.iter().map(|n| n.name.clone()).collect();

    let mut report = PopulateReport::default();
    for candidate in candidates {
        if names.contains(&candidate.name) {
            debug!(name = %candidate.name, "node already present, skipping");
            report.skipped.push(candidate.name.clone());
            continue;
        }

        let child = registry
            .create_document(&candidate.document_type)?
            .with_slug(candidate.name.clone());
        store.save(&child, &Revision::ZERO)?;

        let input = AddFileInput {
            id: NodeId::fresh(),
            name: candidate.name.clone(),
            parent_folder: None,
            document_type: candidate.document_type.clone(),
        };
        let input = serde_json::to_value(&input).map_err(DispatchError::Serialize)?;
        dispatch(
            registry,
            &mut drive,
            Action::new(ADD_FILE, Scope::Global, input),
        )?;

        manifest.insert(&child.header.id);
        names.insert(candidate.name.clone());
        info!(
            name = %candidate.name,
            document_type = %candidate.document_type,
            id = %child.header.id,
            "created document"
        );
        report.created.push(CreatedDocument {
            name: candidate.name.clone(),
            document_id: child.header.id,
        });
    }

    if !report.is_noop() {
        store.save(&drive, &loaded_revision)?;
        store.save_manifest(&manifest)?;
    }
    Ok(report)
}
