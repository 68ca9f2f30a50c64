//! Background task writing snapshots enqueued by the store.
//!
//! The worker drains every command queued since it last woke, saves only the
//! newest snapshot (last write wins), and then releases any flush waiters from
//! that batch. Failures are logged and published on a broadcast channel; the
//! in-memory state is never rolled back.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::organizer::{
    domain::Snapshot,
    ports::KeyValueStore,
    services::persistence::{PersistenceError, SnapshotPersistence},
};

/// Work item sent from the store to the persist worker.
#[derive(Debug)]
pub(crate) enum PersistCommand {
    /// Save the snapshot produced at `revision`.
    Save {
        /// Store revision the snapshot belongs to.
        revision: u64,
        /// Full state to write.
        snapshot: Snapshot,
    },
    /// Signal the sender once every earlier command has been handled.
    Flush(oneshot::Sender<()>),
}

/// A background save that did not reach storage.
#[derive(Debug, Clone)]
pub struct PersistFailure {
    /// Store revision whose snapshot failed to save.
    pub revision: u64,
    /// Underlying persistence error.
    pub error: PersistenceError,
}

#[derive(Default)]
struct Batch {
    latest: Option<(u64, Snapshot)>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl Batch {
    fn absorb(&mut self, command: PersistCommand) {
        match command {
            PersistCommand::Save { revision, snapshot } => {
                let is_newer = self
                    .latest
                    .as_ref()
                    .is_none_or(|(current, _)| revision > *current);
                if is_newer {
                    self.latest = Some((revision, snapshot));
                }
            }
            PersistCommand::Flush(waiter) => self.waiters.push(waiter),
        }
    }
}

/// Runs until every command sender has been dropped.
pub(crate) async fn run_persist_worker<S>(
    persistence: Arc<SnapshotPersistence<S>>,
    mut commands: mpsc::UnboundedReceiver<PersistCommand>,
    failures: broadcast::Sender<PersistFailure>,
) where
    S: KeyValueStore,
{
    info!("persist worker started");
    let mut last_saved: Option<u64> = None;

    while let Some(first) = commands.recv().await {
        let mut batch = Batch::default();
        batch.absorb(first);
        while let Ok(next) = commands.try_recv() {
            batch.absorb(next);
        }

        if let Some((revision, snapshot)) = batch.latest {
            if last_saved.is_none_or(|saved| revision > saved) {
                save(&persistence, &failures, revision, &snapshot).await;
                last_saved = Some(revision);
            }
        }

        for waiter in batch.waiters {
            if waiter.send(()).is_err() {
                debug!("flush waiter went away before acknowledgement");
            }
        }
    }

    info!("persist worker stopped");
}

async fn save<S>(
    persistence: &SnapshotPersistence<S>,
    failures: &broadcast::Sender<PersistFailure>,
    revision: u64,
    snapshot: &Snapshot,
) where
    S: KeyValueStore,
{
    match persistence.save(snapshot).await {
        Ok(()) => debug!(revision, "persisted snapshot"),
        Err(error) => {
            warn!(revision, error = %error, "failed to persist snapshot");
            if failures.send(PersistFailure { revision, error }).is_err() {
                debug!(revision, "no subscribers for persistence failures");
            }
        }
    }
}
