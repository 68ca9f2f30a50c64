//! In-memory key-value storage for tests and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::organizer::ports::{KeyValueStore, StorageError, StorageResult};

/// Thread-safe in-memory key-value store.
///
/// Clones share the same underlying map, so a test can keep one handle to
/// inspect what the organizer wrote through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given entries.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns a copy of the value stored under `key` without going through
    /// the async port.
    ///
    /// Returns `None` when the key is absent or the lock is poisoned.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|err| StorageError::io(std::io::Error::other(err.to_string())))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|err| StorageError::io(std::io::Error::other(err.to_string())))?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
