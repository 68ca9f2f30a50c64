//! The task store: authoritative in-memory state and every mutation on it.
//!
//! State lives in a [`watch`] channel so that each mutation is applied
//! atomically and every subscriber is woken with the new value. Mutations
//! never suspend: they replace the affected collection, bump the revision,
//! enqueue the full snapshot for the persist worker, and return.

use mockable::Clock;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::organizer::{
    config::StoreConfig,
    domain::{
        Assignment, Context, ContextId, ContextPatch, NewContext, NewProject, NewTask,
        OrganizerDomainError, Project, ProjectId, ProjectPatch, Snapshot, Task, TaskId,
        TaskPatch, TaskStatus, defaults, stamp,
    },
    ports::KeyValueStore,
    services::{
        persist_worker::{PersistCommand, PersistFailure, run_persist_worker},
        persistence::{LoadReport, SnapshotPersistence},
    },
};

/// Errors returned by store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The initial load has not completed.
    #[error("store has not finished loading")]
    NotLoaded,

    /// The initial load has already run.
    #[error("store has already been loaded")]
    AlreadyLoaded,

    /// Input validation failed.
    #[error(transparent)]
    Domain(#[from] OrganizerDomainError),

    /// A task referenced a context that does not exist.
    #[error("unknown context: {0}")]
    UnknownContext(ContextId),

    /// A task referenced a project that does not exist.
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),

    /// A workflow operation named a task that does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// The persist worker is no longer running.
    #[error("store persistence has shut down")]
    Closed,

    /// Internal synchronization failure.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Effect of a project or context deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    /// Whether a record with the given id existed and was removed.
    pub removed: bool,
    /// Number of tasks whose reference to the removed record was cleared.
    pub detached_tasks: usize,
}

/// State published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    snapshot: Snapshot,
    is_loading: bool,
    revision: u64,
}

impl StoreState {
    /// Returns the current collections.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Returns `true` until the initial load completes.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Returns the change counter, bumped by the load and every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }
}

/// Receiver side of store change notifications.
#[derive(Debug, Clone)]
pub struct StoreSubscription {
    receiver: watch::Receiver<StoreState>,
}

impl StoreSubscription {
    /// Waits for the next change and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] once the store has been dropped.
    pub async fn changed(&mut self) -> StoreResult<StoreState> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::Closed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Returns the latest state without waiting.
    #[must_use]
    pub fn current(&self) -> StoreState {
        self.receiver.borrow().clone()
    }

    /// Returns `true` when a change has not been observed yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] once the store has been dropped.
    pub fn has_changed(&self) -> StoreResult<bool> {
        self.receiver.has_changed().map_err(|_| StoreError::Closed)
    }
}

/// Outcome of a mutation closure.
pub(super) enum Mutation<T> {
    /// The snapshot was replaced.
    Changed(Snapshot, T),
    /// Nothing changed.
    Unchanged(T),
}

/// Single in-memory source of truth for one running session.
pub struct TaskStore<S, C>
where
    S: KeyValueStore + 'static,
    C: Clock + Send + Sync,
{
    state: watch::Sender<StoreState>,
    persistence: Arc<SnapshotPersistence<S>>,
    commands: mpsc::UnboundedSender<PersistCommand>,
    pending_worker: Mutex<Option<mpsc::UnboundedReceiver<PersistCommand>>>,
    failures: broadcast::Sender<PersistFailure>,
    clock: Arc<C>,
}

impl<S, C> TaskStore<S, C>
where
    S: KeyValueStore + 'static,
    C: Clock + Send + Sync,
{
    /// Creates a store in the loading state.
    ///
    /// Until [`TaskStore::load`] completes the store exposes the default
    /// collections and rejects mutations with [`StoreError::NotLoaded`].
    #[must_use]
    pub fn new(storage: Arc<S>, clock: Arc<C>, config: &StoreConfig) -> Self {
        let initial = if config.seed_defaults {
            Snapshot::new(
                defaults::default_tasks(),
                defaults::default_projects(stamp(&*clock)),
                defaults::default_contexts(),
            )
        } else {
            Snapshot::empty()
        };
        let (state, _) = watch::channel(StoreState {
            snapshot: initial,
            is_loading: true,
            revision: 0,
        });
        let (commands, receiver) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(config.failure_channel_capacity.max(1));

        Self {
            state,
            persistence: Arc::new(SnapshotPersistence::new(storage, config)),
            commands,
            pending_worker: Mutex::new(Some(receiver)),
            failures,
            clock,
        }
    }

    /// Creates a store and performs its initial load.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] when the store's internal lock is
    /// poisoned.
    pub async fn open(storage: Arc<S>, clock: Arc<C>, config: &StoreConfig) -> StoreResult<Self> {
        let store = Self::new(storage, clock, config);
        store.load().await?;
        Ok(store)
    }

    /// Loads the persisted collections and starts background persistence.
    ///
    /// Must be called from within a tokio runtime. Dropping the future before
    /// it completes leaves the store unloaded, and `load` may be called again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyLoaded`] once a load has completed, or
    /// [`StoreError::Internal`] when the store's internal lock is poisoned.
    /// Storage failures are not errors: affected collections fall back to
    /// their defaults and the outcome is described in the [`LoadReport`].
    pub async fn load(&self) -> StoreResult<LoadReport> {
        if !self.is_loading() {
            return Err(StoreError::AlreadyLoaded);
        }
        let loaded = self.persistence.load(&*self.clock).await;

        // Claimed after the await so a cancelled load can be retried.
        let receiver = self
            .pending_worker
            .lock()
            .map_err(|err| StoreError::Internal(err.to_string()))?
            .take()
            .ok_or(StoreError::AlreadyLoaded)?;
        self.state.send_modify(|state| {
            state.snapshot = loaded.snapshot;
            state.is_loading = false;
            state.revision += 1;
        });

        tokio::spawn(run_persist_worker(
            Arc::clone(&self.persistence),
            receiver,
            self.failures.clone(),
        ));
        Ok(loaded.report)
    }

    /// Returns `true` until the initial load completes.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Returns the current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.state.borrow().revision
    }

    /// Returns the current collections.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().snapshot.clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> StoreSubscription {
        StoreSubscription {
            receiver: self.state.subscribe(),
        }
    }

    /// Subscribes to background save failures.
    #[must_use]
    pub fn subscribe_persist_failures(&self) -> broadcast::Receiver<PersistFailure> {
        self.failures.subscribe()
    }

    /// Waits until every save enqueued so far has been attempted.
    ///
    /// Returns immediately while the store is still loading.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Closed`] when the persist worker has stopped.
    pub async fn flush(&self) -> StoreResult<()> {
        if self.is_loading() {
            return Ok(());
        }
        let (done, acknowledged) = oneshot::channel();
        self.commands
            .send(PersistCommand::Flush(done))
            .map_err(|_| StoreError::Closed)?;
        acknowledged.await.map_err(|_| StoreError::Closed)
    }

    /// Tasks with the given status, in collection order.
    #[must_use]
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.snapshot()
            .tasks_by_status(status)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Tasks organized under the given context, in collection order.
    #[must_use]
    pub fn tasks_by_context(&self, context_id: &ContextId) -> Vec<Task> {
        self.snapshot()
            .tasks_by_context(context_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Tasks organized under the given project, in collection order.
    #[must_use]
    pub fn tasks_by_project(&self, project_id: &ProjectId) -> Vec<Task> {
        self.snapshot()
            .tasks_by_project(project_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Appends a new task and returns its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank title, or
    /// [`StoreError::UnknownContext`] / [`StoreError::UnknownProject`] when
    /// the requested assignment does not exist.
    pub fn add_task(&self, request: NewTask) -> StoreResult<TaskId> {
        self.mutate("add_task", |snapshot| {
            ensure_assignment_exists(snapshot, request.assignment())?;
            let task = Task::new(request, &*self.clock)?;
            let id = task.id().clone();
            let mut tasks = snapshot.tasks().to_vec();
            tasks.push(task);
            Ok(Mutation::Changed(snapshot.with_tasks(tasks), id))
        })
    }

    /// Merges `patch` onto the task with `id`.
    ///
    /// Returns the updated task, or `None` when no task has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank title, or
    /// [`StoreError::UnknownContext`] / [`StoreError::UnknownProject`] when
    /// the patch assigns a record that does not exist.
    pub fn update_task(&self, id: &TaskId, patch: TaskPatch) -> StoreResult<Option<Task>> {
        self.mutate("update_task", |snapshot| {
            if snapshot.task(id).is_none() {
                return Ok(Mutation::Unchanged(None));
            }
            if let Some(assignment) = patch.assignment() {
                ensure_assignment_exists(snapshot, assignment)?;
            }
            let mut tasks = snapshot.tasks().to_vec();
            let updated = match tasks.iter_mut().find(|task| task.id() == id) {
                Some(task) => {
                    task.apply(patch, &*self.clock)?;
                    task.clone()
                }
                None => return Ok(Mutation::Unchanged(None)),
            };
            Ok(Mutation::Changed(snapshot.with_tasks(tasks), Some(updated)))
        })
    }

    /// Removes the task with `id`.
    ///
    /// Returns `false` when no task had that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotLoaded`] before the initial load.
    pub fn delete_task(&self, id: &TaskId) -> StoreResult<bool> {
        self.mutate("delete_task", |snapshot| {
            if snapshot.task(id).is_none() {
                return Ok(Mutation::Unchanged(false));
            }
            let tasks = snapshot
                .tasks()
                .iter()
                .filter(|task| task.id() != id)
                .cloned()
                .collect();
            Ok(Mutation::Changed(snapshot.with_tasks(tasks), true))
        })
    }

    /// Appends a new project and returns its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank name.
    pub fn add_project(&self, request: NewProject) -> StoreResult<ProjectId> {
        self.mutate("add_project", |snapshot| {
            let project = Project::new(request, &*self.clock)?;
            let id = project.id().clone();
            let mut projects = snapshot.projects().to_vec();
            projects.push(project);
            Ok(Mutation::Changed(snapshot.with_projects(projects), id))
        })
    }

    /// Merges `patch` onto the project with `id`.
    ///
    /// Returns the updated project, or `None` when no project has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank name.
    pub fn update_project(
        &self,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> StoreResult<Option<Project>> {
        self.mutate("update_project", |snapshot| {
            let mut projects = snapshot.projects().to_vec();
            let updated = match projects.iter_mut().find(|project| project.id() == id) {
                Some(project) => {
                    project.apply(patch)?;
                    project.clone()
                }
                None => return Ok(Mutation::Unchanged(None)),
            };
            Ok(Mutation::Changed(
                snapshot.with_projects(projects),
                Some(updated),
            ))
        })
    }

    /// Removes the project with `id` and clears it from every task that
    /// referenced it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotLoaded`] before the initial load.
    pub fn delete_project(&self, id: &ProjectId) -> StoreResult<Removal> {
        self.mutate("delete_project", |snapshot| {
            if snapshot.project(id).is_none() {
                return Ok(Mutation::Unchanged(Removal::default()));
            }
            let projects = snapshot
                .projects()
                .iter()
                .filter(|project| project.id() != id)
                .cloned()
                .collect();
            let next = snapshot.with_projects(projects);
            let (next, detached_tasks) = detach_tasks(next, |task| task.detach_project(id));
            Ok(Mutation::Changed(
                next,
                Removal {
                    removed: true,
                    detached_tasks,
                },
            ))
        })
    }

    /// Appends a new context and returns its generated id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank name.
    pub fn add_context(&self, request: NewContext) -> StoreResult<ContextId> {
        self.mutate("add_context", |snapshot| {
            let context = Context::new(request)?;
            let id = context.id().clone();
            let mut contexts = snapshot.contexts().to_vec();
            contexts.push(context);
            Ok(Mutation::Changed(snapshot.with_contexts(contexts), id))
        })
    }

    /// Merges `patch` onto the context with `id`.
    ///
    /// Returns the updated context, or `None` when no context has that id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank name.
    pub fn update_context(
        &self,
        id: &ContextId,
        patch: ContextPatch,
    ) -> StoreResult<Option<Context>> {
        self.mutate("update_context", |snapshot| {
            let mut contexts = snapshot.contexts().to_vec();
            let updated = match contexts.iter_mut().find(|context| context.id() == id) {
                Some(context) => {
                    context.apply(patch)?;
                    context.clone()
                }
                None => return Ok(Mutation::Unchanged(None)),
            };
            Ok(Mutation::Changed(
                snapshot.with_contexts(contexts),
                Some(updated),
            ))
        })
    }

    /// Removes the context with `id` and clears it from every task that
    /// referenced it. No other task field changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotLoaded`] before the initial load.
    pub fn delete_context(&self, id: &ContextId) -> StoreResult<Removal> {
        self.mutate("delete_context", |snapshot| {
            if snapshot.context(id).is_none() {
                return Ok(Mutation::Unchanged(Removal::default()));
            }
            let contexts = snapshot
                .contexts()
                .iter()
                .filter(|context| context.id() != id)
                .cloned()
                .collect();
            let next = snapshot.with_contexts(contexts);
            let (next, detached_tasks) = detach_tasks(next, |task| task.detach_context(id));
            Ok(Mutation::Changed(
                next,
                Removal {
                    removed: true,
                    detached_tasks,
                },
            ))
        })
    }

    pub(super) fn clock(&self) -> &C {
        &self.clock
    }

    /// Applies `change` to the current snapshot as one atomic update.
    ///
    /// A changed snapshot bumps the revision, wakes subscribers, and is
    /// enqueued for persistence before the state lock is released, so the
    /// worker sees snapshots in revision order.
    pub(super) fn mutate<T>(
        &self,
        operation: &'static str,
        change: impl FnOnce(&Snapshot) -> StoreResult<Mutation<T>>,
    ) -> StoreResult<T> {
        let mut outcome = Err(StoreError::NotLoaded);
        self.state.send_if_modified(|state| {
            if state.is_loading {
                return false;
            }
            match change(&state.snapshot) {
                Ok(Mutation::Changed(next, value)) => {
                    state.snapshot = next;
                    state.revision += 1;
                    self.enqueue_save(state.revision, state.snapshot.clone());
                    debug!(operation, revision = state.revision, "applied mutation");
                    outcome = Ok(value);
                    true
                }
                Ok(Mutation::Unchanged(value)) => {
                    debug!(operation, "mutation matched no record");
                    outcome = Ok(value);
                    false
                }
                Err(err) => {
                    debug!(operation, error = %err, "mutation rejected");
                    outcome = Err(err);
                    false
                }
            }
        });
        outcome
    }

    fn enqueue_save(&self, revision: u64, snapshot: Snapshot) {
        if self
            .commands
            .send(PersistCommand::Save { revision, snapshot })
            .is_err()
        {
            warn!(revision, "persist worker is gone; change kept in memory only");
        }
    }
}

/// Rejects assignments pointing at records that do not exist.
pub(super) fn ensure_assignment_exists(
    snapshot: &Snapshot,
    assignment: &Assignment,
) -> StoreResult<()> {
    match assignment {
        Assignment::Unassigned => Ok(()),
        Assignment::Context(id) => snapshot
            .context(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownContext(id.clone())),
        Assignment::Project(id) => snapshot
            .project(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownProject(id.clone())),
    }
}

/// Applies `detach` to every task, replacing the task collection only when
/// at least one task changed.
fn detach_tasks(snapshot: Snapshot, detach: impl Fn(&mut Task) -> bool) -> (Snapshot, usize) {
    let mut tasks = snapshot.tasks().to_vec();
    let detached: usize = tasks.iter_mut().map(|task| usize::from(detach(task))).sum();
    if detached == 0 {
        return (snapshot, 0);
    }
    (snapshot.with_tasks(tasks), detached)
}
