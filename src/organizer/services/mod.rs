//! Application services for the organizer.
//!
//! - [`persistence`]: snapshot load/save over the key-value port
//! - [`store`]: the task store and its mutations
//! - `workflow`: capture and clarify steps on the store
//! - `persist_worker`: background saving and failure reporting

mod persist_worker;
pub mod persistence;
pub mod store;
mod workflow;

pub use persist_worker::PersistFailure;
pub use persistence::{
    Collection, CollectionLoad, LoadReport, LoadedSnapshot, PersistenceError, PersistenceResult,
    SnapshotPersistence,
};
pub use store::{
    Removal, StoreError, StoreResult, StoreState, StoreSubscription, TaskStore,
};
