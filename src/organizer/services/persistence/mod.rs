//! Snapshot persistence over a [`KeyValueStore`].
//!
//! The three collections live under three independent keys as JSON arrays.
//! Loading never fails: each collection falls back to its default on its own
//! when the key is absent, unreadable, or damaged, and the outcome is recorded
//! in a [`LoadReport`]. Task references to contexts or projects that did not
//! load are cleared so the task resurfaces in the inbox. Saving writes all three keys concurrently; the writes
//! are not atomic across keys.

mod records;

pub use records::{ContextRecord, ProjectRecord, RecordError, TaskRecord, format_timestamp};

use mockable::Clock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::organizer::{
    config::{RecoveryPolicy, StorageKeys, StoreConfig},
    domain::{Context, ContextId, Project, ProjectId, Snapshot, Task, defaults, stamp},
    ports::{KeyValueStore, StorageError, StorageResult},
};

/// Result type for snapshot persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// One of the three persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// The task array.
    Tasks,
    /// The project array.
    Projects,
    /// The context array.
    Contexts,
}

impl Collection {
    /// Returns the collection name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Projects => "projects",
            Self::Contexts => "contexts",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned while saving a snapshot.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The backend rejected a write.
    #[error("failed to write {collection} under key {key:?}: {source}")]
    Storage {
        /// Collection being written.
        collection: Collection,
        /// Storage key being written.
        key: String,
        /// Backend failure.
        #[source]
        source: StorageError,
    },

    /// The collection could not be serialized.
    #[error("failed to encode {collection}: {source}")]
    Encode {
        /// Collection being encoded.
        collection: Collection,
        /// Serializer failure.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// How one collection was obtained during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionLoad {
    /// Read from storage. `skipped` counts records dropped under
    /// [`RecoveryPolicy::SkipRecord`].
    Loaded {
        /// Number of damaged records dropped.
        skipped: usize,
    },
    /// Nothing was stored; the default value was used.
    Defaulted,
    /// Storage could not be read or parsed; the default value was used.
    Recovered {
        /// Human-readable failure description.
        reason: String,
    },
}

impl CollectionLoad {
    /// Returns `true` when the stored value was discarded or missing.
    #[must_use]
    pub const fn used_default(&self) -> bool {
        matches!(self, Self::Defaulted | Self::Recovered { .. })
    }
}

/// Per-collection outcome of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Outcome for tasks.
    pub tasks: CollectionLoad,
    /// Outcome for projects.
    pub projects: CollectionLoad,
    /// Outcome for contexts.
    pub contexts: CollectionLoad,
    /// Tasks whose context or project reference pointed at nothing and was
    /// cleared.
    pub detached: usize,
}

/// Snapshot produced by a load together with its report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot {
    /// Loaded collections.
    pub snapshot: Snapshot,
    /// How each collection was obtained.
    pub report: LoadReport,
}

/// Reads and writes snapshots through a [`KeyValueStore`].
#[derive(Debug)]
pub struct SnapshotPersistence<S>
where
    S: KeyValueStore,
{
    storage: Arc<S>,
    keys: StorageKeys,
    recovery: RecoveryPolicy,
    seed_defaults: bool,
}

impl<S> SnapshotPersistence<S>
where
    S: KeyValueStore,
{
    /// Creates a persistence layer with the keys and policies of `config`.
    #[must_use]
    pub fn new(storage: Arc<S>, config: &StoreConfig) -> Self {
        Self {
            storage,
            keys: config.keys.clone(),
            recovery: config.recovery,
            seed_defaults: config.seed_defaults,
        }
    }

    /// Loads all three collections.
    ///
    /// Defaults and records with a damaged `createdAt` are stamped with the
    /// current time of `clock`.
    pub async fn load(&self, clock: &impl Clock) -> LoadedSnapshot {
        let (raw_tasks, raw_projects, raw_contexts) = tokio::join!(
            self.storage.get(&self.keys.tasks),
            self.storage.get(&self.keys.projects),
            self.storage.get(&self.keys.contexts),
        );
        let now = stamp(clock);

        let (mut tasks, tasks_load) = self.decode::<TaskRecord, Task, _, _>(
            Collection::Tasks,
            raw_tasks,
            defaults::default_tasks,
            |record| record.into_task(now),
        );
        let (projects, projects_load) = self.decode::<ProjectRecord, Project, _, _>(
            Collection::Projects,
            raw_projects,
            || self.seeded(|| defaults::default_projects(now)),
            |record| record.into_project(now),
        );
        let (contexts, contexts_load) = self.decode::<ContextRecord, Context, _, _>(
            Collection::Contexts,
            raw_contexts,
            || self.seeded(defaults::default_contexts),
            Context::from,
        );
        let detached = detach_dangling(&mut tasks, &projects, &contexts);

        info!(
            tasks = tasks.len(),
            projects = projects.len(),
            contexts = contexts.len(),
            detached,
            "loaded organizer snapshot"
        );

        LoadedSnapshot {
            snapshot: Snapshot::new(tasks, projects, contexts),
            report: LoadReport {
                tasks: tasks_load,
                projects: projects_load,
                contexts: contexts_load,
                detached,
            },
        }
    }

    /// Writes all three collections, overwriting previous values.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Encode`] when a collection cannot be
    /// serialized, or [`PersistenceError::Storage`] for the first write the
    /// backend rejects. Other writes may still have succeeded.
    pub async fn save(&self, snapshot: &Snapshot) -> PersistenceResult<()> {
        let tasks = encode::<TaskRecord, _>(Collection::Tasks, snapshot.tasks())?;
        let projects = encode::<ProjectRecord, _>(Collection::Projects, snapshot.projects())?;
        let contexts = encode::<ContextRecord, _>(Collection::Contexts, snapshot.contexts())?;

        tokio::try_join!(
            self.write(Collection::Tasks, &self.keys.tasks, &tasks),
            self.write(Collection::Projects, &self.keys.projects, &projects),
            self.write(Collection::Contexts, &self.keys.contexts, &contexts),
        )?;
        Ok(())
    }

    async fn write(&self, collection: Collection, key: &str, value: &str) -> PersistenceResult<()> {
        self.storage
            .set(key, value)
            .await
            .map_err(|source| PersistenceError::Storage {
                collection,
                key: key.to_owned(),
                source,
            })
    }

    fn seeded<T>(&self, defaults: impl FnOnce() -> Vec<T>) -> Vec<T> {
        if self.seed_defaults {
            defaults()
        } else {
            Vec::new()
        }
    }

    fn decode<R, T, D, F>(
        &self,
        collection: Collection,
        raw: StorageResult<Option<String>>,
        default: D,
        convert: F,
    ) -> (Vec<T>, CollectionLoad)
    where
        R: DeserializeOwned,
        D: FnOnce() -> Vec<T>,
        F: Fn(R) -> T,
    {
        let text = match raw {
            Ok(Some(text)) => text,
            Ok(None) => return (default(), CollectionLoad::Defaulted),
            Err(err) => return recovered(collection, default, &err),
        };

        match decode_records(&text, self.recovery, convert) {
            Ok((items, skipped)) => (items, CollectionLoad::Loaded { skipped }),
            Err(err) => recovered(collection, default, &err),
        }
    }
}

fn recovered<T>(
    collection: Collection,
    default: impl FnOnce() -> Vec<T>,
    err: &dyn std::error::Error,
) -> (Vec<T>, CollectionLoad) {
    warn!(
        collection = collection.as_str(),
        error = %err,
        "failed to load collection; falling back to defaults"
    );
    (
        default(),
        CollectionLoad::Recovered {
            reason: err.to_string(),
        },
    )
}

/// Parses a stored JSON array record by record.
///
/// Returns the converted records and the number skipped.
fn decode_records<R, T, F>(
    text: &str,
    policy: RecoveryPolicy,
    convert: F,
) -> Result<(Vec<T>, usize), RecordError>
where
    R: DeserializeOwned,
    F: Fn(R) -> T,
{
    let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let mut items = Vec::with_capacity(values.len());
    let mut skipped = 0;

    for value in values {
        match (serde_json::from_value::<R>(value), policy) {
            (Ok(record), _) => items.push(convert(record)),
            (Err(err), RecoveryPolicy::SkipRecord) => {
                warn!(error = %err, "skipping damaged record");
                skipped += 1;
            }
            (Err(err), RecoveryPolicy::DiscardCollection) => return Err(err.into()),
        }
    }
    Ok((items, skipped))
}

/// Clears task references to contexts or projects absent from the snapshot.
fn detach_dangling(tasks: &mut [Task], projects: &[Project], contexts: &[Context]) -> usize {
    let project_ids: HashSet<&ProjectId> = projects.iter().map(Project::id).collect();
    let context_ids: HashSet<&ContextId> = contexts.iter().map(Context::id).collect();
    let mut detached = 0;

    for task in tasks.iter_mut() {
        let dangling_project = task
            .project_id()
            .filter(|id| !project_ids.contains(id))
            .cloned();
        let dangling_context = task
            .context()
            .filter(|id| !context_ids.contains(id))
            .cloned();
        let cleared = match (dangling_project, dangling_context) {
            (Some(project_id), _) => task.detach_project(&project_id),
            (None, Some(context_id)) => task.detach_context(&context_id),
            (None, None) => false,
        };
        if cleared {
            warn!(
                task_id = task.id().as_str(),
                "task referenced a missing context or project; clearing it"
            );
            detached += 1;
        }
    }
    detached
}

fn encode<'a, R, T>(collection: Collection, items: &'a [T]) -> PersistenceResult<String>
where
    R: Serialize + From<&'a T>,
{
    let records: Vec<R> = items.iter().map(R::from).collect();
    serde_json::to_string(&records).map_err(|err| PersistenceError::Encode {
        collection,
        source: Arc::new(err),
    })
}
