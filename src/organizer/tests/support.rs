//! Shared fixtures for organizer unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use mockall::mock;
use rstest::fixture;

use crate::organizer::{
    adapters::memory::InMemoryKeyValueStore,
    config::StoreConfig,
    ports::{KeyValueStore, StorageResult},
    services::TaskStore,
};

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

mock! {
    pub Storage {}

    #[async_trait]
    impl KeyValueStore for Storage {
        async fn get(&self, key: &str) -> StorageResult<Option<String>>;
        async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    }
}

pub type TestStore = TaskStore<InMemoryKeyValueStore, FixedClock>;

/// New Year 2024 at midnight UTC.
#[fixture]
pub fn new_year() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid fixed timestamp")
}

#[fixture]
pub fn clock(new_year: DateTime<Utc>) -> FixedClock {
    FixedClock(new_year)
}

/// Builds an unloaded store over the given storage.
pub fn unloaded_store(storage: InMemoryKeyValueStore, clock: FixedClock) -> TestStore {
    TaskStore::new(Arc::new(storage), Arc::new(clock), &StoreConfig::default())
}

/// Opens a store over the given storage.
pub async fn open_store(storage: InMemoryKeyValueStore, clock: FixedClock) -> TestStore {
    TaskStore::open(Arc::new(storage), Arc::new(clock), &StoreConfig::default())
        .await
        .expect("store should open")
}
