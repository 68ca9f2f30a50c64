//! Task record, its status, and how it is organized.

use super::{ContextId, OrganizerDomainError, ParseTaskStatusError, ProjectId, TaskId, stamp};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task workflow status.
///
/// Stored values are parsed leniently through [`TryFrom<&str>`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum TaskStatus {
    /// Captured but not yet clarified.
    Inbox,
    /// Clarified and actionable.
    Active,
    /// Done.
    Completed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "inbox" => Ok(Self::Inbox),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

/// Where a task is organized.
///
/// A task belongs to at most one context or one project, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Assignment {
    /// Neither a context nor a project.
    #[default]
    Unassigned,
    /// A next action performed in the given context.
    Context(ContextId),
    /// A task belonging to the given project.
    Project(ProjectId),
}

impl Assignment {
    /// Returns the referenced context, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&ContextId> {
        match self {
            Self::Context(id) => Some(id),
            Self::Unassigned | Self::Project(_) => None,
        }
    }

    /// Returns the referenced project, if any.
    #[must_use]
    pub const fn project(&self) -> Option<&ProjectId> {
        match self {
            Self::Project(id) => Some(id),
            Self::Unassigned | Self::Context(_) => None,
        }
    }

    /// Returns `true` when neither a context nor a project is set.
    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unassigned)
    }
}

/// Task record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    title: String,
    status: TaskStatus,
    assignment: Assignment,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted context or project reference.
    pub assignment: Assignment,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted completion timestamp, if any.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    title: String,
    status: TaskStatus,
    assignment: Assignment,
}

impl NewTask {
    /// Creates an unassigned inbox task request.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: TaskStatus::Inbox,
            assignment: Assignment::Unassigned,
        }
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the initial context or project.
    #[must_use]
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Returns the requested assignment.
    #[must_use]
    pub const fn assignment(&self) -> &Assignment {
        &self.assignment
    }
}

/// Partial update for a task. Fields left unset are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    title: Option<String>,
    status: Option<TaskStatus>,
    assignment: Option<Assignment>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Replaces the status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Replaces the assignment. [`Assignment::Unassigned`] clears both
    /// references.
    #[must_use]
    pub fn with_assignment(mut self, assignment: Assignment) -> Self {
        self.assignment = Some(assignment);
        self
    }

    /// Returns the assignment this patch would set, if any.
    #[must_use]
    pub const fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }
}

impl Task {
    /// Creates a new task with a generated id and the current time.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyTaskTitle`] when the title is
    /// blank.
    pub fn new(request: NewTask, clock: &impl Clock) -> Result<Self, OrganizerDomainError> {
        let title = normalize_title(request.title)?;
        let timestamp = stamp(clock);
        let completed_at = (request.status == TaskStatus::Completed).then_some(timestamp);

        Ok(Self {
            id: TaskId::new(),
            title,
            status: request.status,
            assignment: request.assignment,
            created_at: timestamp,
            completed_at,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            status: data.status,
            assignment: data.assignment,
            created_at: data.created_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the workflow status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the context or project this task is organized under.
    #[must_use]
    pub const fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Returns the referenced context, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&ContextId> {
        self.assignment.context()
    }

    /// Returns the referenced project, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<&ProjectId> {
        self.assignment.project()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the completion timestamp, present only while completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Merges a patch onto this task.
    ///
    /// Entering [`TaskStatus::Completed`] stamps `completed_at`; leaving it
    /// clears the stamp.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyTaskTitle`] when the patch
    /// carries a blank title. The task is left unchanged in that case.
    pub fn apply(&mut self, patch: TaskPatch, clock: &impl Clock) -> Result<(), OrganizerDomainError> {
        let title = patch.title.map(normalize_title).transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(status) = patch.status {
            self.set_status(status, clock);
        }
        if let Some(assignment) = patch.assignment {
            self.assignment = assignment;
        }
        Ok(())
    }

    /// Clears the assignment when it points at `context_id`.
    ///
    /// Returns `true` when the task changed.
    pub fn detach_context(&mut self, context_id: &ContextId) -> bool {
        if self.assignment.context() != Some(context_id) {
            return false;
        }
        self.assignment = Assignment::Unassigned;
        true
    }

    /// Clears the assignment when it points at `project_id`.
    ///
    /// Returns `true` when the task changed.
    pub fn detach_project(&mut self, project_id: &ProjectId) -> bool {
        if self.assignment.project() != Some(project_id) {
            return false;
        }
        self.assignment = Assignment::Unassigned;
        true
    }

    fn set_status(&mut self, status: TaskStatus, clock: &impl Clock) {
        match (self.status, status) {
            (TaskStatus::Completed, TaskStatus::Completed) => {}
            (_, TaskStatus::Completed) => self.completed_at = Some(stamp(clock)),
            _ => self.completed_at = None,
        }
        self.status = status;
    }
}

fn normalize_title(title: String) -> Result<String, OrganizerDomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(OrganizerDomainError::EmptyTaskTitle);
    }
    Ok(trimmed.to_owned())
}
