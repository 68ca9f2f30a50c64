//! Key-value storage port backing snapshot persistence.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for key-value storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable text storage addressed by key.
///
/// Any device key-value store, file directory, or document store can back the
/// organizer as long as it honours this contract.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `None` when nothing has been stored under the key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend rejects the write.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Errors returned by key-value storage implementations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The key contains characters the backend cannot address.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Backend I/O failure.
    #[error("storage I/O error: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps a backend error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }
}
