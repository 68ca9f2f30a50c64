//! Domain model for capturing and organizing tasks.
//!
//! Tasks, projects, and contexts are plain records with accessors. A task
//! refers to at most one context or project by id; there are no
//! back-pointers, so relationships are resolved by scanning the task
//! collection of a [`Snapshot`].

pub mod defaults;
mod error;
mod ids;
mod project;
mod snapshot;
mod task;
mod timestamp;

pub use error::{OrganizerDomainError, ParseTaskStatusError};
pub use ids::{ContextId, ProjectId, TaskId};
pub use project::{Context, ContextPatch, NewContext, NewProject, Project, ProjectPatch};
pub use snapshot::{ProjectProgress, Snapshot};
pub use task::{Assignment, NewTask, PersistedTaskData, Task, TaskPatch, TaskStatus};
pub(crate) use timestamp::stamp;
