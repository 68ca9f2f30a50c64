//! Storage adapters for the organizer.
//!
//! Concrete implementations of the [`KeyValueStore`] port.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryKeyValueStore`]: Thread-safe in-memory storage for
//!   tests and ephemeral sessions
//! - [`directory::DirectoryKeyValueStore`]: One JSON file per key in a
//!   capability-scoped directory
//!
//! [`KeyValueStore`]: crate::organizer::ports::KeyValueStore

pub mod directory;
pub mod memory;
