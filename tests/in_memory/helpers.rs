//! Shared test helpers for in-memory store integration tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use clarify::organizer::{
    adapters::memory::InMemoryKeyValueStore,
    config::StoreConfig,
    services::{StoreResult, TaskStore},
};
use mockable::Clock;
use rstest::fixture;

/// Store type used across the in-memory suites.
pub type TestStore = TaskStore<InMemoryKeyValueStore, StaticClock>;

/// Clock pinned to one instant so persisted timestamps are predictable.
#[derive(Debug, Clone, Copy)]
pub struct StaticClock(pub DateTime<Utc>);

impl Clock for StaticClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Provides a clock fixed at 2024-01-01T00:00:00Z.
#[fixture]
pub fn clock() -> StaticClock {
    StaticClock(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    )
}

/// Provides empty shared storage for each test.
#[fixture]
pub fn storage() -> InMemoryKeyValueStore {
    InMemoryKeyValueStore::new()
}

/// Opens a store with the default configuration.
///
/// # Errors
///
/// Returns an error if the initial load fails.
pub async fn open_store(
    storage: &InMemoryKeyValueStore,
    clock: StaticClock,
) -> StoreResult<TestStore> {
    open_store_with(storage, clock, &StoreConfig::default()).await
}

/// Opens a store with an explicit configuration.
///
/// # Errors
///
/// Returns an error if the initial load fails.
pub async fn open_store_with(
    storage: &InMemoryKeyValueStore,
    clock: StaticClock,
    config: &StoreConfig,
) -> StoreResult<TestStore> {
    TaskStore::open(Arc::new(storage.clone()), Arc::new(clock), config).await
}
