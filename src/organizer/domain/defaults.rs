//! Built-in collections used when storage holds nothing yet.

use super::{Context, ContextId, Project, ProjectId, Task};
use chrono::{DateTime, Utc};

const DEFAULT_CONTEXTS: [(&str, &str); 4] = [
    ("1", "@computer"),
    ("2", "@home"),
    ("3", "@errands"),
    ("4", "@office"),
];

const DEFAULT_PROJECTS: [(&str, &str); 2] = [("1", "Personal"), ("2", "Work")];

/// Returns the starter contexts: `@computer`, `@home`, `@errands`, `@office`.
#[must_use]
pub fn default_contexts() -> Vec<Context> {
    DEFAULT_CONTEXTS
        .iter()
        .map(|(id, name)| Context::from_persisted(ContextId::from_existing(*id), (*name).to_owned()))
        .collect()
}

/// Returns the starter projects `Personal` and `Work`, created at `now`.
#[must_use]
pub fn default_projects(now: DateTime<Utc>) -> Vec<Project> {
    DEFAULT_PROJECTS
        .iter()
        .map(|(id, name)| {
            Project::from_persisted(ProjectId::from_existing(*id), (*name).to_owned(), None, now)
        })
        .collect()
}

/// Returns the starter task list, which is empty.
#[must_use]
pub const fn default_tasks() -> Vec<Task> {
    Vec::new()
}
