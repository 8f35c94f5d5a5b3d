//! Shared test helpers for quire integration tests.
//!
//! All tests use temp directories; nothing touches a real store. The
//! [`offering`] module defines a sample document type (a service
//! offering with requirements and option-group tier pricing) used to
//! exercise the engine the way domain document types do.

#![allow(dead_code)]

pub mod offering;

use quire::drive::actions as drive_actions;
use quire::registry::Registry;
use quire::storage::DocumentStore;
use tempfile::TempDir;

/// A registry with the drive and offering document types registered.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    drive_actions::register(&mut registry).expect("register drive");
    offering::register(&mut registry).expect("register offering");
    registry
}

/// A fresh store in its own temp directory. Keep the `TempDir` alive
/// for the duration of the test.
pub fn store() -> (TempDir, DocumentStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = DocumentStore::open(dir.path().join("documents")).expect("open store");
    (dir, store)
}
