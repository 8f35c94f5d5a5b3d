//! Core data model: identifiers, actions, documents, and tri-state
//! update fields.
//!
//! # Modules
//!
//! - [`types`]: validated ids, the scope tag, timestamp helpers
//! - [`action`]: the [`action::Action`] command description
//! - [`document`]: the [`document::Document`] record and its header
//! - [`update`]: tri-state [`update::Update`] fields for partial updates

pub mod action;
pub mod document;
pub mod types;
pub mod update;
