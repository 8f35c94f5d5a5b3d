//! Manifest: a denormalized index of every document id in a store.
//!
//! Kept as its own `manifest.json` file so enumeration does not require
//! scanning the storage directory. Callers are responsible for keeping
//! it in sync with the drive's operations; the populate procedure does
//! so, and `insert` is idempotent so re-running maintenance never
//! produces duplicates. Wire form: `{"documentIds": ["…"]}`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::types::DocumentId;

use super::{write_json_atomic, StorageError};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The list of document ids physically present in a store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Document ids, in insertion order, without duplicates.
    pub document_ids: Vec<String>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.document_ids.len()
    }

    /// Returns `true` if no documents are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document_ids.is_empty()
    }

    /// Returns `true` if the id is indexed.
    #[must_use]
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.document_ids.iter().any(|d| d == id.as_str())
    }

    /// Add an id if absent. Returns `true` if it was inserted.
    pub fn insert(&mut self, id: &DocumentId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.document_ids.push(id.as_str().to_owned());
        true
    }

    /// Remove an id if present. Returns `true` if it was removed.
    pub fn remove(&mut self, id: &DocumentId) -> bool {
        let before = self.document_ids.len();
        self.document_ids.retain(|d| d != id.as_str());
        self.document_ids.len() != before
    }

    /// Load a manifest file; a missing file yields an empty manifest.
    ///
    /// # Errors
    /// Returns an I/O or parse error.
    pub fn load_from(path: &Path) -> Result<Self, StorageError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).map_err(|e| StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Deserialize {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save the manifest atomically.
    ///
    /// # Errors
    /// Returns an I/O or serialization error.
    pub fn save_to(&self, path: &Path) -> Result<(), StorageError> {
        write_json_atomic(path, self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
