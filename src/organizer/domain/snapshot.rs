//! Immutable view of all three collections and the queries over it.
//!
//! A [`Snapshot`] is replaced, never mutated: the store builds a new value for
//! every change and reuses the `Arc` of each collection it did not touch.
//! Consumers can therefore detect which collection changed by identity with
//! [`Snapshot::same_tasks`] and friends.
//!
//! Every query is recomputed from the snapshot on each call and returns
//! records in collection (insertion) order.

use super::{Context, ContextId, Project, ProjectId, Task, TaskId, TaskStatus};
use std::sync::Arc;

/// All tasks, projects, and contexts at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tasks: Arc<[Task]>,
    projects: Arc<[Project]>,
    contexts: Arc<[Context]>,
}

/// Completion counts for one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectProgress {
    /// Number of tasks assigned to the project.
    pub total: usize,
    /// Number of those tasks that are completed.
    pub completed: usize,
}

impl ProjectProgress {
    /// Number of tasks still open.
    #[must_use]
    pub const fn open(self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

impl Snapshot {
    /// Creates a snapshot from owned collections.
    #[must_use]
    pub fn new(tasks: Vec<Task>, projects: Vec<Project>, contexts: Vec<Context>) -> Self {
        Self {
            tasks: tasks.into(),
            projects: projects.into(),
            contexts: contexts.into(),
        }
    }

    /// Creates a snapshot with no records at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    /// Returns all tasks.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns all projects.
    #[must_use]
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Returns all contexts.
    #[must_use]
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Returns a copy with the task collection replaced.
    #[must_use]
    pub fn with_tasks(&self, tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into(),
            projects: Arc::clone(&self.projects),
            contexts: Arc::clone(&self.contexts),
        }
    }

    /// Returns a copy with the project collection replaced.
    #[must_use]
    pub fn with_projects(&self, projects: Vec<Project>) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            projects: projects.into(),
            contexts: Arc::clone(&self.contexts),
        }
    }

    /// Returns a copy with the context collection replaced.
    #[must_use]
    pub fn with_contexts(&self, contexts: Vec<Context>) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
            projects: Arc::clone(&self.projects),
            contexts: contexts.into(),
        }
    }

    /// Returns `true` when both snapshots share the same task collection value.
    #[must_use]
    pub fn same_tasks(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tasks, &other.tasks)
    }

    /// Returns `true` when both snapshots share the same project collection value.
    #[must_use]
    pub fn same_projects(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.projects, &other.projects)
    }

    /// Returns `true` when both snapshots share the same context collection value.
    #[must_use]
    pub fn same_contexts(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.contexts, &other.contexts)
    }

    /// Finds a task by id.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Finds a project by id.
    #[must_use]
    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|project| project.id() == id)
    }

    /// Finds a context by id.
    #[must_use]
    pub fn context(&self, id: &ContextId) -> Option<&Context> {
        self.contexts.iter().find(|context| context.id() == id)
    }

    /// Tasks whose status equals `status`.
    #[must_use]
    pub fn tasks_by_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.filter_tasks(|task| task.status() == status)
    }

    /// Tasks organized under the given context.
    #[must_use]
    pub fn tasks_by_context(&self, context_id: &ContextId) -> Vec<&Task> {
        self.filter_tasks(|task| task.context() == Some(context_id))
    }

    /// Tasks organized under the given project.
    #[must_use]
    pub fn tasks_by_project(&self, project_id: &ProjectId) -> Vec<&Task> {
        self.filter_tasks(|task| task.project_id() == Some(project_id))
    }

    /// Inbox tasks that have not been organized yet.
    #[must_use]
    pub fn inbox(&self) -> Vec<&Task> {
        self.filter_tasks(|task| {
            task.status() == TaskStatus::Inbox && task.assignment().is_unassigned()
        })
    }

    /// Active tasks, optionally restricted to one context.
    #[must_use]
    pub fn next_actions(&self, context_id: Option<&ContextId>) -> Vec<&Task> {
        self.filter_tasks(|task| {
            task.status() == TaskStatus::Active
                && context_id.is_none_or(|id| task.context() == Some(id))
        })
    }

    /// Completed tasks.
    #[must_use]
    pub fn completed_tasks(&self) -> Vec<&Task> {
        self.tasks_by_status(TaskStatus::Completed)
    }

    /// Tasks of a project that are not completed yet.
    #[must_use]
    pub fn open_project_tasks(&self, project_id: &ProjectId) -> Vec<&Task> {
        self.filter_tasks(|task| {
            task.project_id() == Some(project_id) && task.status() != TaskStatus::Completed
        })
    }

    /// Completion counts for a project.
    #[must_use]
    pub fn project_progress(&self, project_id: &ProjectId) -> ProjectProgress {
        self.tasks_by_project(project_id)
            .into_iter()
            .fold(ProjectProgress::default(), |progress, task| ProjectProgress {
                total: progress.total + 1,
                completed: progress.completed
                    + usize::from(task.status() == TaskStatus::Completed),
            })
    }

    /// Number of tasks referencing a context.
    #[must_use]
    pub fn context_usage(&self, context_id: &ContextId) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.context() == Some(context_id))
            .count()
    }

    /// Number of tasks referencing a project.
    #[must_use]
    pub fn project_usage(&self, project_id: &ProjectId) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.project_id() == Some(project_id))
            .count()
    }

    fn filter_tasks(&self, predicate: impl Fn(&Task) -> bool) -> Vec<&Task> {
        self.tasks.iter().filter(|task| predicate(task)).collect()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.tasks == other.tasks
            && self.projects == other.projects
            && self.contexts == other.contexts
    }
}

impl Eq for Snapshot {}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}
