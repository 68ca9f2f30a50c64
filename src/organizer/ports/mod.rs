//! Port contracts for organizer persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by organizer services.

pub mod storage;

pub use storage::{KeyValueStore, StorageError, StorageResult};
