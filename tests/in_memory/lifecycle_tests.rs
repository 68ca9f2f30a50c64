//! In-memory integration tests for loading and persisting the store.

use clarify::organizer::{
    adapters::memory::InMemoryKeyValueStore,
    config::{RecoveryPolicy, StorageKeys, StoreConfig},
    domain::{Assignment, NewProject, NewTask, TaskStatus},
    services::{CollectionLoad, TaskStore},
};
use std::sync::Arc;
use rstest::rstest;
use serde_json::Value;

use super::helpers::{StaticClock, clock, open_store, open_store_with, storage};

fn stored_json(storage: &InMemoryKeyValueStore, key: &str) -> Result<Value, eyre::Report> {
    let raw = storage
        .peek(key)
        .ok_or_else(|| eyre::eyre!("nothing stored under {key}"))?;
    serde_json::from_str(&raw).map_err(eyre::Report::from)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_run_seeds_starter_data(storage: InMemoryKeyValueStore, clock: StaticClock) {
    let store = open_store(&storage, clock)
        .await
        .expect("store should open");

    let snapshot = store.snapshot();
    assert!(snapshot.tasks().is_empty());
    assert_eq!(snapshot.projects().len(), 2);
    assert_eq!(snapshot.contexts().len(), 4);
    assert!(storage.peek("tasks").is_none(), "loading alone writes nothing");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn changes_survive_a_restart(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let store = open_store(&storage, clock).await?;
    let project_id = store.add_project(NewProject::new("Taxes").with_description("2024 return"))?;
    let task_id = store.add_task(
        NewTask::new("Collect receipts")
            .with_status(TaskStatus::Active)
            .with_assignment(Assignment::Project(project_id.clone())),
    )?;
    store.toggle_completion(&task_id)?;
    store.flush().await?;
    let before = store.snapshot();
    drop(store);

    let reopened = open_store(&storage, clock).await?;
    let after = reopened.snapshot();

    eyre::ensure!(after == before, "reloaded snapshot differs");
    let task = after
        .task(&task_id)
        .ok_or_else(|| eyre::eyre!("task missing after reload"))?;
    eyre::ensure!(task.completed_at() == Some(clock.0), "completion stamp lost");
    eyre::ensure!(
        after.project(&project_id).and_then(|p| p.description()) == Some("2024 return"),
        "project description lost"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn persisted_layout_uses_camel_case_and_iso_dates(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let store = open_store(&storage, clock).await?;
    store.capture("Buy milk", None)?;
    store.flush().await?;

    let tasks = stored_json(&storage, "tasks")?;
    let first = tasks
        .as_array()
        .and_then(|records| records.first())
        .ok_or_else(|| eyre::eyre!("expected one task record"))?;
    eyre::ensure!(first["title"] == "Buy milk", "title not stored");
    eyre::ensure!(first["status"] == "inbox", "status not stored");
    eyre::ensure!(
        first["createdAt"] == "2024-01-01T00:00:00.000Z",
        "unexpected createdAt: {}",
        first["createdAt"]
    );
    eyre::ensure!(first.get("context").is_none(), "absent context was written");
    eyre::ensure!(first.get("projectId").is_none(), "absent project was written");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn corrupted_collection_falls_back_without_touching_others(clock: StaticClock) {
    let storage = InMemoryKeyValueStore::with_entries([
        ("tasks", "{not json"),
        ("contexts", r#"[{"id":"c1","name":"@garden"}]"#),
    ]);
    let store = TaskStore::new(
        Arc::new(storage),
        Arc::new(clock),
        &StoreConfig::default(),
    );

    let report = store.load().await.expect("load should succeed");

    assert!(matches!(report.tasks, CollectionLoad::Recovered { .. }));
    assert_eq!(report.projects, CollectionLoad::Defaulted);
    assert_eq!(report.contexts, CollectionLoad::Loaded { skipped: 0 });
    let snapshot = store.snapshot();
    assert!(snapshot.tasks().is_empty());
    let names: Vec<&str> = snapshot.contexts().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["@garden"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn skip_policy_keeps_the_readable_records(clock: StaticClock) {
    let storage = InMemoryKeyValueStore::with_entries([(
        "tasks",
        r#"[
            {"id":"1","title":"Good","status":"inbox","createdAt":"2024-02-01T10:00:00.000Z"},
            {"id":"2","title":"Bad status","status":"someday","createdAt":"2024-02-01T10:00:00.000Z"}
        ]"#,
    )]);
    let config = StoreConfig::default().with_recovery(RecoveryPolicy::SkipRecord);

    let store = open_store_with(&storage, clock, &config)
        .await
        .expect("store should open");

    let titles: Vec<String> = store
        .snapshot()
        .tasks()
        .iter()
        .map(|task| task.title().to_owned())
        .collect();
    assert_eq!(titles, ["Good"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn namespaced_keys_isolate_two_stores(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let work = StoreConfig::default().with_keys(StorageKeys::namespaced("work"));
    let home = StoreConfig::default().with_keys(StorageKeys::namespaced("home"));

    let work_store = open_store_with(&storage, clock, &work).await?;
    work_store.capture("Quarterly report", None)?;
    work_store.flush().await?;
    let home_store = open_store_with(&storage, clock, &home).await?;

    eyre::ensure!(storage.peek("work_tasks").is_some(), "work tasks not written");
    eyre::ensure!(home_store.snapshot().tasks().is_empty(), "home store saw work tasks");
    Ok(())
}
