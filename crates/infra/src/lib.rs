//! Infrastructure layer: event persistence, command dispatch, read models,
//! projections, and the projection worker loop.

pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod workers;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use read_model::{InMemoryReadStore, ReadStore};
pub use workers::{ProjectionWorker, WorkerHandle};
