//! Engine configuration (`quire.toml`).
//!
//! Typed configuration for the `quire` binary: where documents are
//! stored, which drive the maintenance commands operate on, and the
//! candidate list for population. Missing fields use defaults; a
//! missing file yields the full default configuration (no error).
//!
//! ```toml
//! [storage]
//! root = ".quire/documents"
//!
//! [drive]
//! id = "main"
//! slug = "main-drive"
//!
//! [[populate.documents]]
//! name = "Service Offerings"
//! document_type = "quire/drive"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration for the `quire` binary.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct QuireConfig {
    /// Document storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Drive selection.
    #[serde(default)]
    pub drive: DriveConfig,

    /// Population candidate list.
    #[serde(default)]
    pub populate: PopulateConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Document storage settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding document files and the manifest
    /// (default: `.quire/documents`).
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(".quire/documents")
}

/// Which drive document maintenance commands operate on.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriveConfig {
    /// The drive document's id (default: `"main"`).
    #[serde(default = "default_drive_id")]
    pub id: String,

    /// Slug given to a freshly created drive (default: `"main-drive"`).
    #[serde(default = "default_drive_slug")]
    pub slug: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            id: default_drive_id(),
            slug: default_drive_slug(),
        }
    }
}

fn default_drive_id() -> String {
    "main".to_owned()
}

fn default_drive_slug() -> String {
    "main-drive".to_owned()
}

/// The candidate list for `quire populate`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulateConfig {
    /// Candidate documents, in creation order.
    #[serde(default)]
    pub documents: Vec<PopulateDocConfig>,
}

/// One population candidate.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PopulateDocConfig {
    /// Drive node display name (also the idempotence key).
    pub name: String,

    /// Document type of the child document to create.
    pub document_type: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    Io {
        /// The config file path.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    Parse {
        /// The config file path.
        path: PathBuf,
        /// The underlying TOML error.
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl QuireConfig {
    /// Load configuration from a TOML file. A missing file yields the
    /// default configuration.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
