//! The drive document type: a document whose global state describes a
//! tree of other documents.
//!
//! A drive is not special to the engine. Its nodes change through the
//! same dispatch path as any other document, so its operation log is
//! the full audit trail of the tree's history. What is drive-specific
//! lives here: the node state types, the reducers, and the maintenance
//! procedure that seeds a drive from a candidate list.
//!
//! # Modules
//!
//! - [`types`]: [`types::DriveState`] and [`types::DriveNode`]
//! - [`actions`]: `ADD_FILE` / `ADD_FOLDER` / `UPDATE_NODE` /
//!   `REMOVE_NODE` reducers and their registration
//! - [`populate`]: idempotent drive population over a candidate list

pub mod actions;
pub mod populate;
pub mod types;
