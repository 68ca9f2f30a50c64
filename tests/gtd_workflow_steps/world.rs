//! Shared world state for capture and clarify BDD scenarios.

use std::sync::Arc;

use clarify::organizer::{
    adapters::memory::InMemoryKeyValueStore,
    config::StoreConfig,
    domain::{ContextId, ProjectId, Task},
    services::TaskStore,
};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest::fixture;

/// Store type used by the BDD world.
pub type WorldStore = TaskStore<InMemoryKeyValueStore, DefaultClock>;

/// Scenario world for workflow behaviour tests.
#[derive(Default)]
pub struct OrganizerWorld {
    pub storage: InMemoryKeyValueStore,
    pub store: Option<WorldStore>,
}

impl OrganizerWorld {
    /// Opens a store over the world's storage, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be loaded.
    pub fn open(&mut self) -> Result<(), eyre::Report> {
        self.store = None;
        let store = run_async(TaskStore::open(
            Arc::new(self.storage.clone()),
            Arc::new(DefaultClock),
            &StoreConfig::default(),
        ))
        .wrap_err("open organizer store")?;
        self.store = Some(store);
        Ok(())
    }

    /// Returns the open store.
    ///
    /// # Errors
    ///
    /// Returns an error if no store has been opened yet.
    pub fn store(&self) -> Result<&WorldStore, eyre::Report> {
        self.store
            .as_ref()
            .ok_or_else(|| eyre::eyre!("organizer store not opened in scenario world"))
    }

    /// Finds a task by title.
    ///
    /// # Errors
    ///
    /// Returns an error if no task has that title.
    pub fn task_named(&self, title: &str) -> Result<Task, eyre::Report> {
        self.store()?
            .snapshot()
            .tasks()
            .iter()
            .find(|task| task.title() == title)
            .cloned()
            .ok_or_else(|| eyre::eyre!("no task titled {title:?}"))
    }

    /// Finds a context id by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no context has that name.
    pub fn context_named(&self, name: &str) -> Result<ContextId, eyre::Report> {
        self.store()?
            .snapshot()
            .contexts()
            .iter()
            .find(|context| context.name() == name)
            .map(|context| context.id().clone())
            .ok_or_else(|| eyre::eyre!("no context named {name:?}"))
    }

    /// Finds a project id by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no project has that name.
    pub fn project_named(&self, name: &str) -> Result<ProjectId, eyre::Report> {
        self.store()?
            .snapshot()
            .projects()
            .iter()
            .find(|project| project.name() == name)
            .map(|project| project.id().clone())
            .ok_or_else(|| eyre::eyre!("no project named {name:?}"))
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> OrganizerWorld {
    OrganizerWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
