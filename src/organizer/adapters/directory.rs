//! Directory-backed key-value storage.
//!
//! Each key maps to one `<key>.json` file inside a capability-scoped
//! directory. Writes go to a temporary sibling first and are then renamed over
//! the target, so a reader never observes a half-written value for a single
//! key. Filesystem calls are blocking and run on tokio's blocking pool.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;

use crate::organizer::ports::{KeyValueStore, StorageError, StorageResult};

const FILE_EXTENSION: &str = "json";

/// Key-value store persisting each key as a file in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryKeyValueStore {
    dir: Arc<Dir>,
}

impl DirectoryKeyValueStore {
    /// Opens `path`, creating it and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: &Utf8Path) -> StorageResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority()).map_err(StorageError::io)?;
        let dir = Dir::open_ambient_dir(path, ambient_authority()).map_err(StorageError::io)?;
        Ok(Self::from_dir(dir))
    }

    /// Wraps an already opened directory capability.
    #[must_use]
    pub fn from_dir(dir: Dir) -> Self {
        Self { dir: Arc::new(dir) }
    }
}

/// Maps a storage key to its file name, rejecting keys that could escape the
/// directory or collide with temporary files.
fn file_name_for(key: &str) -> StorageResult<String> {
    let is_valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
    if !is_valid {
        return Err(StorageError::InvalidKey(key.to_owned()));
    }
    Ok(format!("{key}.{FILE_EXTENSION}"))
}

/// Runs a blocking filesystem operation on the blocking thread pool.
async fn run_blocking<F, T>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| StorageError::io(io::Error::other(format!("task join error: {err}"))))?
}

#[async_trait]
impl KeyValueStore for DirectoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let file_name = file_name_for(key)?;
        let dir = Arc::clone(&self.dir);
        run_blocking(move || match dir.read_to_string(&file_name) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(err)),
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let file_name = file_name_for(key)?;
        let temp_name = format!(".{file_name}.tmp");
        let contents = value.to_owned();
        let dir = Arc::clone(&self.dir);
        run_blocking(move || {
            dir.write(&temp_name, contents.as_bytes())
                .map_err(StorageError::io)?;
            dir.rename(&temp_name, &dir, &file_name)
                .map_err(StorageError::io)
        })
        .await
    }
}
