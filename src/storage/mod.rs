//! Whole-file JSON persistence for documents.
//!
//! A [`DocumentStore`] is a directory of `<document-id>.json` files plus
//! a `manifest.json` index (see [`manifest`]). Reads and writes are
//! whole-document: load parses the entire file, save replaces it via
//! write-to-temp + fsync + atomic rename.
//!
//! # Concurrent writers
//!
//! Two processes that load the same document, each append an operation,
//! and blindly save last-write-wins would silently lose one writer's
//! operation. Saves therefore carry an optimistic-concurrency check:
//! the caller passes the revision it loaded, and the save is rejected
//! with [`StorageError::RevisionConflict`] if the on-disk revision has
//! advanced since. The caller must reload and retry; the store never
//! retries on its own.

pub mod manifest;

use std::fmt;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::model::document::{Document, Revision};
use crate::model::types::DocumentId;

use self::manifest::Manifest;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors raised by the document store.
#[derive(Debug)]
pub enum StorageError {
    /// Filesystem failure.
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A value could not be serialized to JSON.
    Serialize {
        /// The destination path.
        path: PathBuf,
        /// The underlying serde error.
        source: serde_json::Error,
    },

    /// A file's content could not be deserialized.
    Deserialize {
        /// The offending file.
        path: PathBuf,
        /// The underlying serde error.
        source: serde_json::Error,
    },

    /// No document file exists for the id.
    NotFound {
        /// The missing document id.
        id: DocumentId,
    },

    /// The on-disk revision is not the one the caller loaded.
    RevisionConflict {
        /// The document being saved.
        id: DocumentId,
        /// The revision the caller loaded.
        expected: Revision,
        /// The revision currently on disk.
        found: Revision,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "I/O error at {}: {source}", path.display())
            }
            Self::Serialize { path, source } => {
                write!(f, "failed to serialize {}: {source}", path.display())
            }
            Self::Deserialize { path, source } => {
                write!(f, "failed to deserialize {}: {source}", path.display())
            }
            Self::NotFound { id } => write!(f, "no document stored with id '{id}'"),
            Self::RevisionConflict {
                id,
                expected,
                found,
            } => write!(
                f,
                "document '{id}' changed on disk: loaded at revision ({expected}), \
                 found ({found}).\n  To fix: reload the document and retry the save."
            ),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize { source, .. } | Self::Deserialize { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// A directory-backed store of whole-document JSON files.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open (creating if necessary) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::Io {
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file path backing a document id.
    #[must_use]
    pub fn document_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// The file path of the manifest index.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Returns `true` if a document file exists for the id.
    #[must_use]
    pub fn exists(&self, id: &DocumentId) -> bool {
        self.document_path(id).is_file()
    }

    /// Load a document by id (whole-file read).
    ///
    /// # Errors
    /// Returns `NotFound` if no file exists, or an I/O or parse error.
    pub fn load(&self, id: &DocumentId) -> Result<Document, StorageError> {
        let path = self.document_path(id);
        if !path.is_file() {
            return Err(StorageError::NotFound { id: id.clone() });
        }
        let bytes = fs::read(&path).map_err(|e| StorageError::Io {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Deserialize { path, source: e })
    }

    /// Save a document (whole-file replace), guarded by the revision the
    /// caller loaded.
    ///
    /// `expected` is the document's revision as of the caller's load
    /// ([`Revision::ZERO`] for a document that did not exist yet). If the
    /// on-disk revision differs, a concurrent writer has committed in
    /// between and the save is rejected; reload and retry.
    ///
    /// # Errors
    /// Returns `RevisionConflict` on a lost race, or an I/O or
    /// serialization error.
    pub fn save(&self, document: &Document, expected: &Revision) -> Result<(), StorageError> {
        let id = &document.header.id;
        match self.load(id) {
            Ok(on_disk) => {
                if on_disk.header.revision != *expected {
                    return Err(StorageError::RevisionConflict {
                        id: id.clone(),
                        expected: *expected,
                        found: on_disk.header.revision,
                    });
                }
            }
            Err(StorageError::NotFound { .. }) => {
                if *expected != Revision::ZERO {
                    return Err(StorageError::RevisionConflict {
                        id: id.clone(),
                        expected: *expected,
                        found: Revision::ZERO,
                    });
                }
            }
            Err(e) => return Err(e),
        }

        self.write_json(&self.document_path(id), document)
    }

    /// Enumerate the ids of every document file physically present,
    /// bypassing the manifest. Intended for maintenance tooling that
    /// reconciles the manifest against the directory.
    ///
    /// # Errors
    /// Returns an I/O error if the directory cannot be read.
    pub fn list_ids(&self) -> Result<Vec<DocumentId>, StorageError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StorageError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            if stem == "manifest" {
                continue;
            }
            // Skip foreign files that do not carry a well-formed id.
            if let Ok(id) = DocumentId::new(stem) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Delete a document file.
    ///
    /// # Errors
    /// Returns `NotFound` if no file exists, or an I/O error.
    pub fn remove(&self, id: &DocumentId) -> Result<(), StorageError> {
        let path = self.document_path(id);
        if !path.is_file() {
            return Err(StorageError::NotFound { id: id.clone() });
        }
        fs::remove_file(&path).map_err(|e| StorageError::Io { path, source: e })
    }

    /// Load the manifest index; a missing file yields an empty manifest.
    ///
    /// # Errors
    /// Returns an I/O or parse error.
    pub fn load_manifest(&self) -> Result<Manifest, StorageError> {
        Manifest::load_from(&self.manifest_path())
    }

    /// Save the manifest index atomically.
    ///
    /// # Errors
    /// Returns an I/O or serialization error.
    pub fn save_manifest(&self, manifest: &Manifest) -> Result<(), StorageError> {
        self.write_json(&self.manifest_path(), manifest)
    }

    /// Write a JSON value atomically: serialize to pretty JSON, write to
    /// a dot-prefixed temp file in the same directory, fsync, rename.
    pub(crate) fn write_json<T: Serialize>(
        &self,
        path: &Path,
        value: &T,
    ) -> Result<(), StorageError> {
        write_json_atomic(path, value)
    }
}

/// Atomic JSON file write: temp file in the target directory, fsync,
/// rename over the destination.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| StorageError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_owned());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = fs::File::create(&tmp_path).map_err(|e| StorageError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    file.write_all(json.as_bytes())
        .map_err(|e| StorageError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
    file.sync_all().map_err(|e| StorageError::Io {
        path: tmp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| StorageError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::Document;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path().join("documents")).unwrap();
        (dir, store)
    }

    fn doc() -> Document {
        Document::create("test/notes", json!({"entries": []}), json!({}))
    }

    #[test]
    fn open_creates_root_directory() {
        let (_dir, store) = store();
        assert!(store.root().is_dir());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (_dir, store) = store();
        let doc = doc();
        store.save(&doc, &Revision::ZERO).unwrap();
        let loaded = store.load(&doc.header.id).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn load_missing_is_not_found() {
        let (_dir, store) = store();
        let id = DocumentId::fresh();
        let err = store.load(&id).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[test]
    fn exists_tracks_files() {
        let (_dir, store) = store();
        let doc = doc();
        assert!(!store.exists(&doc.header.id));
        store.save(&doc, &Revision::ZERO).unwrap();
        assert!(store.exists(&doc.header.id));
    }

    #[test]
    fn save_new_document_requires_zero_expected_revision() {
        let (_dir, store) = store();
        let doc = doc();
        let stale = Revision {
            global: 1,
            local: 0,
        };
        let err = store.save(&doc, &stale).unwrap_err();
        assert!(matches!(err, StorageError::RevisionConflict { .. }));
    }

    #[test]
    fn save_rejects_stale_writer() {
        let (_dir, store) = store();
        let mut doc = doc();
        store.save(&doc, &Revision::ZERO).unwrap();

        // Writer A advances the on-disk revision.
        doc.header.revision.global = 1;
        store.save(&doc, &Revision::ZERO).unwrap();

        // Writer B still holds the revision-zero view and loses.
        let mut stale = doc.clone();
        stale.header.revision.global = 1;
        let err = store.save(&stale, &Revision::ZERO).unwrap_err();
        match err {
            StorageError::RevisionConflict { expected, found, .. } => {
                assert_eq!(expected, Revision::ZERO);
                assert_eq!(found.global, 1);
            }
            other => panic!("expected RevisionConflict, got {other:?}"),
        }
    }

    #[test]
    fn save_with_matching_revision_succeeds() {
        let (_dir, store) = store();
        let mut doc = doc();
        store.save(&doc, &Revision::ZERO).unwrap();

        let loaded_at = doc.header.revision;
        doc.header.revision.global = 1;
        store.save(&doc, &loaded_at).unwrap();

        let reloaded = store.load(&doc.header.id).unwrap();
        assert_eq!(reloaded.header.revision.global, 1);
    }

    #[test]
    fn remove_deletes_the_file() {
        let (_dir, store) = store();
        let doc = doc();
        store.save(&doc, &Revision::ZERO).unwrap();
        store.remove(&doc.header.id).unwrap();
        assert!(!store.exists(&doc.header.id));
        assert!(matches!(
            store.remove(&doc.header.id).unwrap_err(),
            StorageError::NotFound { .. }
        ));
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let (_dir, store) = store();
        let doc = doc();
        store.save(&doc, &Revision::ZERO).unwrap();
        let leftovers: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn list_ids_scans_document_files_only() {
        let (_dir, store) = store();
        let a = doc();
        let b = doc();
        store.save(&a, &Revision::ZERO).unwrap();
        store.save(&b, &Revision::ZERO).unwrap();
        store.save_manifest(&Manifest::default()).unwrap();

        let ids = store.list_ids().unwrap();
        assert_eq!(ids.len(), 2, "manifest.json must not be listed");
        assert!(ids.contains(&a.header.id));
        assert!(ids.contains(&b.header.id));
    }

    #[test]
    fn manifest_missing_file_is_empty() {
        let (_dir, store) = store();
        let manifest = store.load_manifest().unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn manifest_roundtrip_through_store() {
        let (_dir, store) = store();
        let mut manifest = Manifest::default();
        assert!(manifest.insert(&DocumentId::new("a1").unwrap()));
        store.save_manifest(&manifest).unwrap();
        let loaded = store.load_manifest().unwrap();
        assert_eq!(loaded, manifest);
    }
}
