//! Core identifier and scope types for quire.
//!
//! Foundation types used throughout the engine: document identifiers,
//! drive node identifiers, the global/local scope tag, and timestamp
//! helpers. Identifiers are validated newtypes so malformed ids are
//! rejected at the serde boundary rather than deep inside a reducer.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

/// Maximum length of a document or node identifier.
const MAX_ID_LEN: usize = 64;

fn validate_id(kind: ErrorKind, s: &str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError {
            kind,
            value: s.to_owned(),
            reason: "identifier must not be empty".to_owned(),
        });
    }
    if s.len() > MAX_ID_LEN {
        return Err(ValidationError {
            kind,
            value: s.to_owned(),
            reason: format!(
                "identifier must be at most {MAX_ID_LEN} characters, got {}",
                s.len()
            ),
        });
    }
    if s.starts_with('-') || s.ends_with('-') {
        return Err(ValidationError {
            kind,
            value: s.to_owned(),
            reason: "identifier must not start or end with a hyphen".to_owned(),
        });
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError {
            kind,
            value: s.to_owned(),
            reason:
                "identifier must contain only lowercase letters (a-z), digits (0-9), and hyphens (-)"
                    .to_owned(),
        });
    }
    Ok(())
}

/// Generate a fresh 32-character lowercase hex identifier.
#[must_use]
pub fn fresh_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// A validated document identifier.
///
/// Lowercase alphanumeric with hyphens, 1-64 characters. Freshly created
/// documents get a random 32-character hex id; well-known documents (for
/// example a drive) may use a human-chosen id such as `main`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new `DocumentId` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the id is empty, too long, or contains invalid
    /// characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        validate_id(ErrorKind::DocumentId, s)?;
        Ok(Self(s.to_owned()))
    }

    /// Generate a fresh random document id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(fresh_id())
    }

    /// Return the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_id(ErrorKind::DocumentId, &s)?;
        Ok(Self(s))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// A validated drive node identifier.
///
/// Same format rules as [`DocumentId`]. Node ids are unique within a
/// single drive's node list.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Create a new `NodeId` from a string, validating format.
    ///
    /// # Errors
    /// Returns an error if the id is empty, too long, or contains invalid
    /// characters.
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        validate_id(ErrorKind::NodeId, s)?;
        Ok(Self(s.to_owned()))
    }

    /// Generate a fresh random node id.
    #[must_use]
    pub fn fresh() -> Self {
        Self(fresh_id())
    }

    /// Return the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = ValidationError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        validate_id(ErrorKind::NodeId, &s)?;
        Ok(Self(s))
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// The state partition an action targets.
///
/// Every document carries two independently-evolving partitions: `global`
/// (shared, replicated state) and `local` (machine-private state). Each
/// partition has its own operation log and revision counter, and a reducer
/// registered for one scope never sees the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The shared state partition.
    Global,
    /// The machine-private state partition.
    Local,
}

impl Scope {
    /// Both scopes, in canonical order.
    pub const ALL: [Self; 2] = [Self::Global, Self::Local];

    /// Return the lowercase wire name of this scope.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current UTC time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_utc_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Current UTC time as an ISO 8601 string with millisecond precision,
/// for example `2026-08-05T12:00:00.000Z`.
#[must_use]
pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// The kind of value that failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A [`DocumentId`] validation error.
    DocumentId,
    /// A [`NodeId`] validation error.
    NodeId,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentId => write!(f, "DocumentId"),
            Self::NodeId => write!(f, "NodeId"),
        }
    }
}

/// A validation error for quire identifier types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// What kind of value was being validated.
    pub kind: ErrorKind,
    /// The invalid value.
    pub value: String,
    /// Human-readable explanation.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}: {}", self.kind, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
