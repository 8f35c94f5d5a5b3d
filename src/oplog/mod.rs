//! Per-scope append-only operation log.
//!
//! Every document records, per scope, an ordered sequence of
//! [`types::Operation`]s. Appending is the dispatch engine's job; this
//! module owns the record type and the read side: replaying the log to
//! derive state and verifying that the log, hashes, and cached state
//! still agree.
//!
//! # Modules
//!
//! - [`types`]: the [`types::Operation`] record and canonical JSON
//! - [`replay`]: left-fold replay, skip resolution, integrity checks

pub mod replay;
pub mod types;
