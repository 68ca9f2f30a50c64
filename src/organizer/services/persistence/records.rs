//! Persisted JSON shapes for tasks, projects, and contexts.
//!
//! Field names are `camelCase` and optional fields are omitted when absent, so
//! the stored arrays stay readable by earlier releases. Timestamps are
//! ISO-8601 UTC strings with millisecond precision.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::organizer::domain::{
    Assignment, Context, ContextId, PersistedTaskData, Project, ProjectId, Task, TaskId,
    TaskStatus,
};

/// Reasons a single stored record cannot be turned back into a domain value.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The JSON value does not have the expected shape.
    #[error("malformed record: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Stored task shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    id: String,
    title: String,
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<String>,
}

/// Stored project shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    id: String,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

/// Stored context shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRecord {
    id: String,
    name: String,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().as_str().to_owned(),
            title: task.title().to_owned(),
            status: task.status(),
            context: task.context().map(|id| id.as_str().to_owned()),
            project_id: task.project_id().map(|id| id.as_str().to_owned()),
            created_at: Some(format_timestamp(task.created_at())),
            completed_at: task.completed_at().map(format_timestamp),
        }
    }
}

impl TaskRecord {
    /// Rebuilds the task, repairing damaged fields instead of rejecting it.
    ///
    /// A missing or unparseable `createdAt` becomes `loaded_at`.
    #[must_use]
    pub fn into_task(self, loaded_at: DateTime<Utc>) -> Task {
        let created_at = created_or(&self.id, self.created_at.as_deref(), loaded_at);
        let completed_at = self
            .completed_at
            .as_deref()
            .and_then(|raw| optional_timestamp(&self.id, "completedAt", raw));
        let assignment = assignment_from_parts(
            &self.id,
            non_empty(self.context),
            non_empty(self.project_id),
        );

        Task::from_persisted(PersistedTaskData {
            id: TaskId::from_existing(self.id),
            title: self.title,
            status: self.status,
            assignment,
            created_at,
            completed_at,
        })
    }
}

impl From<&Project> for ProjectRecord {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id().as_str().to_owned(),
            name: project.name().to_owned(),
            description: project.description().map(ToOwned::to_owned),
            created_at: Some(format_timestamp(project.created_at())),
        }
    }
}

impl ProjectRecord {
    /// Rebuilds the project; a missing or unparseable `createdAt` becomes
    /// `loaded_at`.
    #[must_use]
    pub fn into_project(self, loaded_at: DateTime<Utc>) -> Project {
        let created_at = created_or(&self.id, self.created_at.as_deref(), loaded_at);
        Project::from_persisted(
            ProjectId::from_existing(self.id),
            self.name,
            self.description,
            created_at,
        )
    }
}

impl From<&Context> for ContextRecord {
    fn from(context: &Context) -> Self {
        Self {
            id: context.id().as_str().to_owned(),
            name: context.name().to_owned(),
        }
    }
}

impl From<ContextRecord> for Context {
    fn from(record: ContextRecord) -> Self {
        Self::from_persisted(ContextId::from_existing(record.id), record.name)
    }
}

/// Formats a timestamp the way it is stored: `2024-01-01T00:00:00.000Z`.
#[must_use]
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn created_or(id: &str, raw: Option<&str>, loaded_at: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(parsed) = raw.and_then(parse_timestamp) {
        return parsed;
    }
    warn!(
        record_id = id,
        value = raw.unwrap_or_default(),
        "createdAt is missing or unparseable; using the load time"
    );
    loaded_at
}

/// Parses an optional timestamp, dropping it with a warning when damaged.
fn optional_timestamp(id: &str, field: &'static str, raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        warn!(task_id = id, field, value = raw, "dropping unparseable timestamp");
    }
    parsed
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

/// Older data may hold both references; the project wins.
fn assignment_from_parts(id: &str, context: Option<String>, project: Option<String>) -> Assignment {
    match (context, project) {
        (None, None) => Assignment::Unassigned,
        (Some(context), None) => Assignment::Context(ContextId::from_existing(context)),
        (None, Some(project)) => Assignment::Project(ProjectId::from_existing(project)),
        (Some(context), Some(project)) => {
            warn!(
                task_id = id,
                context = context.as_str(),
                project = project.as_str(),
                "task references both a context and a project; keeping the project"
            );
            Assignment::Project(ProjectId::from_existing(project))
        }
    }
}
