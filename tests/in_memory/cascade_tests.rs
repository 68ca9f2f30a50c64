//! In-memory integration tests for deleting contexts and projects.

use clarify::organizer::{
    adapters::memory::InMemoryKeyValueStore,
    domain::{Assignment, NewContext, NewProject, NewTask, TaskStatus},
    services::Removal,
};
use rstest::rstest;

use super::helpers::{StaticClock, clock, open_store, storage};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn context_deletion_detaches_every_referencing_task(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let store = open_store(&storage, clock).await?;
    let phone = store.add_context(NewContext::new("@phone"))?;
    let calls: Vec<_> = ["Dentist", "Plumber", "Bank"]
        .into_iter()
        .map(|title| {
            store.add_task(
                NewTask::new(title)
                    .with_status(TaskStatus::Active)
                    .with_assignment(Assignment::Context(phone.clone())),
            )
        })
        .collect::<Result<_, _>>()?;
    let usage = store.snapshot().context_usage(&phone);

    let removal = store.delete_context(&phone)?;

    eyre::ensure!(usage == 3, "expected three tasks in @phone, found {usage}");
    eyre::ensure!(
        removal
            == Removal {
                removed: true,
                detached_tasks: 3
            },
        "unexpected removal {removal:?}"
    );
    let snapshot = store.snapshot();
    for id in &calls {
        let task = snapshot
            .task(id)
            .ok_or_else(|| eyre::eyre!("task {id} removed by cascade"))?;
        eyre::ensure!(task.context().is_none(), "task {id} still references @phone");
        eyre::ensure!(task.status() == TaskStatus::Active, "task {id} changed status");
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn project_deletion_detaches_and_persists(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let store = open_store(&storage, clock).await?;
    let project = store.add_project(NewProject::new("Conference"))?;
    let talk = store.capture("Write talk", Some(project.clone()))?;

    store.delete_project(&project)?;
    store.flush().await?;
    drop(store);

    let reopened = open_store(&storage, clock).await?;
    let snapshot = reopened.snapshot();
    eyre::ensure!(snapshot.project(&project).is_none(), "project came back");
    let task = snapshot
        .task(&talk)
        .ok_or_else(|| eyre::eyre!("task lost on reload"))?;
    eyre::ensure!(task.project_id().is_none(), "dangling project reference persisted");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_deletes_change_nothing(
    storage: InMemoryKeyValueStore,
    clock: StaticClock,
) -> Result<(), eyre::Report> {
    let store = open_store(&storage, clock).await?;
    let errands = store
        .snapshot()
        .contexts()
        .iter()
        .find(|context| context.name() == "@errands")
        .map(|context| context.id().clone())
        .ok_or_else(|| eyre::eyre!("starter context missing"))?;

    store.delete_context(&errands)?;
    let revision = store.revision();
    let second = store.delete_context(&errands)?;

    eyre::ensure!(second == Removal::default(), "second delete reported {second:?}");
    eyre::ensure!(store.revision() == revision, "second delete bumped the revision");
    Ok(())
}
