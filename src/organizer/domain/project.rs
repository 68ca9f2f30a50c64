//! Project and context records.
//!
//! Both are named groupings a task can be organized under. Projects carry a
//! creation time and an optional description; contexts are bare names such
//! as `@home`.

use super::{ContextId, OrganizerDomainError, ProjectId, stamp};
use chrono::{DateTime, Utc};
use mockable::Clock;

/// Project record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

/// Request payload for creating a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    name: String,
    description: Option<String>,
}

impl NewProject {
    /// Creates a project request with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Sets the project description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    name: Option<String>,
    description: Option<Option<String>>,
}

impl ProjectPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    /// Removes the description.
    #[must_use]
    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }
}

impl Project {
    /// Creates a new project with a generated id and the current time.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyProjectName`] when the name is
    /// blank.
    pub fn new(request: NewProject, clock: &impl Clock) -> Result<Self, OrganizerDomainError> {
        let name = normalize_name(request.name, OrganizerDomainError::EmptyProjectName)?;
        Ok(Self {
            id: ProjectId::new(),
            name,
            description: request.description,
            created_at: stamp(clock),
        })
    }

    /// Reconstructs a project from persisted storage.
    #[must_use]
    pub const fn from_persisted(
        id: ProjectId,
        name: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
        }
    }

    /// Returns the project identifier.
    #[must_use]
    pub const fn id(&self) -> &ProjectId {
        &self.id
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Merges a patch onto this project.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyProjectName`] when the patch
    /// carries a blank name.
    pub fn apply(&mut self, patch: ProjectPatch) -> Result<(), OrganizerDomainError> {
        if let Some(name) = patch.name {
            self.name = normalize_name(name, OrganizerDomainError::EmptyProjectName)?;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        Ok(())
    }
}

/// Context record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    id: ContextId,
    name: String,
}

/// Request payload for creating a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContext {
    name: String,
}

impl NewContext {
    /// Creates a context request with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Partial update for a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPatch {
    name: Option<String>,
}

impl ContextPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Context {
    /// Creates a new context with a generated id.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyContextName`] when the name is
    /// blank.
    pub fn new(request: NewContext) -> Result<Self, OrganizerDomainError> {
        let name = normalize_name(request.name, OrganizerDomainError::EmptyContextName)?;
        Ok(Self {
            id: ContextId::new(),
            name,
        })
    }

    /// Reconstructs a context from persisted storage.
    #[must_use]
    pub const fn from_persisted(id: ContextId, name: String) -> Self {
        Self { id, name }
    }

    /// Returns the context identifier.
    #[must_use]
    pub const fn id(&self) -> &ContextId {
        &self.id
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merges a patch onto this context.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizerDomainError::EmptyContextName`] when the patch
    /// carries a blank name.
    pub fn apply(&mut self, patch: ContextPatch) -> Result<(), OrganizerDomainError> {
        if let Some(name) = patch.name {
            self.name = normalize_name(name, OrganizerDomainError::EmptyContextName)?;
        }
        Ok(())
    }
}

fn normalize_name(name: String, empty_error: OrganizerDomainError) -> Result<String, OrganizerDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(empty_error);
    }
    Ok(trimmed.to_owned())
}
