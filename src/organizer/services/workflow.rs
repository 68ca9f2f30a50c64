//! Capture and clarify operations built on the store primitives.
//!
//! These are the steps a user takes in the inbox: capture a title, then
//! process it into a context or a project. Each operation is a single atomic
//! store mutation.

use mockable::Clock;

use super::store::{Mutation, StoreError, StoreResult, TaskStore};
use crate::organizer::{
    domain::{
        Assignment, ContextId, NewProject, NewTask, Project, ProjectId, Task, TaskId, TaskPatch,
        TaskStatus,
    },
    ports::KeyValueStore,
};

impl<S, C> TaskStore<S, C>
where
    S: KeyValueStore + 'static,
    C: Clock + Send + Sync,
{
    /// Captures a new task.
    ///
    /// Without a target project the task lands in the inbox unassigned; with
    /// one it is immediately active in that project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Domain`] for a blank title, or
    /// [`StoreError::UnknownProject`] when the target project does not exist.
    pub fn capture(
        &self,
        title: impl Into<String>,
        target_project: Option<ProjectId>,
    ) -> StoreResult<TaskId> {
        let request = match target_project {
            Some(project_id) => NewTask::new(title)
                .with_status(TaskStatus::Active)
                .with_assignment(Assignment::Project(project_id)),
            None => NewTask::new(title),
        };
        self.add_task(request)
    }

    /// Makes a task an active next action in `context_id`, clearing any
    /// project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTask`] or [`StoreError::UnknownContext`]
    /// when either record does not exist.
    pub fn process_into_context(&self, task_id: &TaskId, context_id: ContextId) -> StoreResult<Task> {
        let patch = TaskPatch::new()
            .with_status(TaskStatus::Active)
            .with_assignment(Assignment::Context(context_id));
        self.update_task(task_id, patch)?
            .ok_or_else(|| StoreError::UnknownTask(task_id.clone()))
    }

    /// Makes a task active in `project_id`, clearing any context.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTask`] or [`StoreError::UnknownProject`]
    /// when either record does not exist.
    pub fn process_into_project(&self, task_id: &TaskId, project_id: ProjectId) -> StoreResult<Task> {
        let patch = TaskPatch::new()
            .with_status(TaskStatus::Active)
            .with_assignment(Assignment::Project(project_id));
        self.update_task(task_id, patch)?
            .ok_or_else(|| StoreError::UnknownTask(task_id.clone()))
    }

    /// Creates a project and processes `task_id` into it in one step.
    ///
    /// Nothing is created when the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTask`] when the task does not exist, or
    /// [`StoreError::Domain`] for a blank project name.
    pub fn create_project_for_task(
        &self,
        task_id: &TaskId,
        request: NewProject,
    ) -> StoreResult<ProjectId> {
        self.mutate("create_project_for_task", |snapshot| {
            if snapshot.task(task_id).is_none() {
                return Err(StoreError::UnknownTask(task_id.clone()));
            }
            let project = Project::new(request, self.clock())?;
            let project_id = project.id().clone();
            let mut projects = snapshot.projects().to_vec();
            projects.push(project);
            let next = snapshot.with_projects(projects);

            let patch = TaskPatch::new()
                .with_status(TaskStatus::Active)
                .with_assignment(Assignment::Project(project_id.clone()));
            let mut tasks = next.tasks().to_vec();
            if let Some(task) = tasks.iter_mut().find(|task| task.id() == task_id) {
                task.apply(patch, self.clock())?;
            }
            Ok(Mutation::Changed(next.with_tasks(tasks), project_id))
        })
    }

    /// Flips a task between completed and active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownTask`] when the task does not exist.
    pub fn toggle_completion(&self, task_id: &TaskId) -> StoreResult<Task> {
        self.mutate("toggle_completion", |snapshot| {
            let mut tasks = snapshot.tasks().to_vec();
            let Some(task) = tasks.iter_mut().find(|task| task.id() == task_id) else {
                return Err(StoreError::UnknownTask(task_id.clone()));
            };
            let status = if task.status() == TaskStatus::Completed {
                TaskStatus::Active
            } else {
                TaskStatus::Completed
            };
            task.apply(TaskPatch::new().with_status(status), self.clock())?;
            let toggled = task.clone();
            Ok(Mutation::Changed(snapshot.with_tasks(tasks), toggled))
        })
    }
}
