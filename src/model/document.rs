//! Document: a versioned record with two independently-evolving state
//! partitions, reconstructed by replaying its operation logs.
//!
//! `state.global` and `state.local` are caches. The source of truth is the
//! per-scope operation log plus the document type's initial state; replay
//! must always reproduce the cached values (the verification path in
//! [`crate::oplog::replay`] checks exactly that).
//!
//! Wire form is camelCase JSON:
//!
//! ```text
//! {
//!   "header": {"branch", "createdAtUtcIso", "documentType", "id",
//!              "lastModifiedAtUtcIso", "meta", "revision": {"global", "local"},
//!              "sig": {"nonce", "publicKey"}, "slug"},
//!   "state": {"auth", "document": {"hash": {"algorithm", "encoding"}, "version"},
//!             "global", "local"},
//!   "operations": {"global": [...], "local": [...]}
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::oplog::types::Operation;

use super::types::{now_utc_iso, DocumentId, Scope};

// ---------------------------------------------------------------------------
// Revision
// ---------------------------------------------------------------------------

/// Per-scope operation counts. Always equals the corresponding operation
/// log length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// Count of operations applied to the global scope.
    pub global: u32,
    /// Count of operations applied to the local scope.
    pub local: u32,
}

impl Revision {
    /// The revision of a document with no operations.
    pub const ZERO: Self = Self {
        global: 0,
        local: 0,
    };

    /// Return the count for one scope.
    #[must_use]
    pub const fn of(self, scope: Scope) -> u32 {
        match scope {
            Scope::Global => self.global,
            Scope::Local => self.local,
        }
    }

    /// Increment the count for one scope.
    pub fn bump(&mut self, scope: Scope) {
        match scope {
            Scope::Global => self.global += 1,
            Scope::Local => self.local += 1,
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "global={} local={}", self.global, self.local)
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Signing metadata carried in the document header.
///
/// Populated by callers that sign documents; empty strings otherwise.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Signing nonce.
    pub nonce: String,
    /// Signer public key.
    pub public_key: String,
}

/// Document header: identity, type, revision counters, and audit
/// timestamps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHeader {
    /// Branch name this document evolves on.
    pub branch: String,
    /// ISO 8601 UTC creation time.
    pub created_at_utc_iso: String,
    /// The registered document type, for example `quire/drive`.
    pub document_type: String,
    /// Unique document id.
    pub id: DocumentId,
    /// ISO 8601 UTC time of the most recent committed operation.
    pub last_modified_at_utc_iso: String,
    /// Free-form caller metadata.
    pub meta: Value,
    /// Per-scope operation counts.
    pub revision: Revision,
    /// Signing metadata.
    pub sig: Signature,
    /// Human-readable slug.
    pub slug: String,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Content-hash parameters advertised by the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashSettings {
    /// Hash algorithm name.
    pub algorithm: String,
    /// Digest encoding name.
    pub encoding: String,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            algorithm: "sha256".to_owned(),
            encoding: "hex".to_owned(),
        }
    }
}

/// The `state.document` partition: engine-level metadata, not touched by
/// reducers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMeta {
    /// Content-hash parameters for this document's operations.
    pub hash: HashSettings,
    /// Document format version.
    pub version: u32,
}

impl Default for StateMeta {
    fn default() -> Self {
        Self {
            hash: HashSettings::default(),
            version: 1,
        }
    }
}

/// All state partitions of a document.
///
/// `global` and `local` are the reducer-visible caches; `auth` and
/// `document` are engine partitions outside the dispatch path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
    /// Authorization partition (engine-level, reducers never see it).
    pub auth: Value,
    /// Engine metadata partition.
    pub document: StateMeta,
    /// Cached global scope state.
    pub global: Value,
    /// Cached local scope state.
    pub local: Value,
}

// ---------------------------------------------------------------------------
// Operation logs
// ---------------------------------------------------------------------------

/// The per-scope append-only operation logs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationLogs {
    /// Global scope log, ordered by index.
    pub global: Vec<Operation>,
    /// Local scope log, ordered by index.
    pub local: Vec<Operation>,
}

impl OperationLogs {
    /// Borrow one scope's log.
    #[must_use]
    pub const fn of(&self, scope: Scope) -> &Vec<Operation> {
        match scope {
            Scope::Global => &self.global,
            Scope::Local => &self.local,
        }
    }

    /// Mutably borrow one scope's log.
    pub fn of_mut(&mut self, scope: Scope) -> &mut Vec<Operation> {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Local => &mut self.local,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A versioned, event-sourced document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Identity, type, and revision counters.
    pub header: DocumentHeader,
    /// State partitions (scope states are caches over the logs).
    pub state: DocumentState,
    /// Per-scope operation logs (the source of truth).
    pub operations: OperationLogs,
}

impl Document {
    /// Create a fresh document of the given type with empty operation logs.
    ///
    /// `initial_global` / `initial_local` are the document type's initial
    /// scope states, normally supplied by
    /// [`crate::registry::Registry::create_document`].
    #[must_use]
    pub fn create(document_type: &str, initial_global: Value, initial_local: Value) -> Self {
        let now = now_utc_iso();
        Self {
            header: DocumentHeader {
                branch: "main".to_owned(),
                created_at_utc_iso: now.clone(),
                document_type: document_type.to_owned(),
                id: DocumentId::fresh(),
                last_modified_at_utc_iso: now,
                meta: json!({}),
                revision: Revision::ZERO,
                sig: Signature::default(),
                slug: String::new(),
            },
            state: DocumentState {
                auth: json!({}),
                document: StateMeta::default(),
                global: initial_global,
                local: initial_local,
            },
            operations: OperationLogs::default(),
        }
    }

    /// Replace the document id (well-known documents such as a drive).
    #[must_use]
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.header.id = id;
        self
    }

    /// Replace the slug.
    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.header.slug = slug.into();
        self
    }

    /// Replace the free-form header metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.header.meta = meta;
        self
    }

    /// Borrow the cached state of one scope.
    #[must_use]
    pub const fn state_of(&self, scope: Scope) -> &Value {
        match scope {
            Scope::Global => &self.state.global,
            Scope::Local => &self.state.local,
        }
    }

    /// Mutably borrow the cached state of one scope.
    pub fn state_of_mut(&mut self, scope: Scope) -> &mut Value {
        match scope {
            Scope::Global => &mut self.state.global,
            Scope::Local => &mut self.state.local,
        }
    }

    /// Borrow one scope's operation log.
    #[must_use]
    pub const fn operations_of(&self, scope: Scope) -> &Vec<Operation> {
        self.operations.of(scope)
    }

    /// The revision (operation count) of one scope.
    #[must_use]
    pub const fn revision_of(&self, scope: Scope) -> u32 {
        self.header.revision.of(scope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
