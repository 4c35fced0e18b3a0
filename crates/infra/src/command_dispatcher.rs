//! Command execution pipeline.
//!
//! One consistent lifecycle for every aggregate: load the stream, rehydrate,
//! handle the command (pure), append with an optimistic concurrency check,
//! then publish the committed events to the bus. If publication fails after a
//! successful append the events are already durable, so delivery is
//! at-least-once and consumers must be idempotent.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use findermeister_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use findermeister_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale version or domain conflict).
    Concurrency(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Domain invariant failure (deterministic).
    InvariantViolation(String),
    /// Domain authorization failure.
    Unauthorized,
    /// Domain-level not found.
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
    /// Publication failed after a successful append (at-least-once; retry may duplicate).
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the store and bus so tests run fully in memory and a real
/// backend can be swapped in without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full pipeline.
    ///
    /// The `make_aggregate` closure supplies a fresh empty instance (e.g.
    /// `Find::empty(id)`); the dispatcher stays ignorant of construction.
    /// Returns the committed events with their assigned sequence numbers.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: findermeister_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        // 5) Publish committed events (after append)
        for stored in &committed {
            self.bus
                .publish(stored.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        Ok(committed)
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    stream: &[StoredEvent],
) -> Result<(), DispatchError> {
    // Guard against a buggy backend returning foreign or unordered events.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    // Ensure deterministic ordering.
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    use findermeister_events::InMemoryEventBus;
    use findermeister_finds::{Find, FindCommand, FindEvent, FindId, PostFind};

    use crate::event_store::InMemoryEventStore;

    fn post_cmd(find_id: FindId) -> FindCommand {
        FindCommand::PostFind(PostFind {
            find_id,
            client_id: findermeister_core::UserId::new(),
            title: "rare vinyl pressing".to_string(),
            description: "original 1973 pressing, any condition".to_string(),
            budget: Some(250),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn dispatch_appends_and_publishes() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let d = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::clone(&bus));

        let find_id = FindId::new(AggregateId::new());
        let committed = d
            .dispatch::<Find>(find_id.0, "finds.find", post_cmd(find_id), |id| {
                Find::empty(FindId::new(id))
            })
            .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(committed[0].event_type, "finds.find.posted");

        let envelope = sub.try_recv().unwrap();
        assert_eq!(envelope.aggregate_id(), find_id.0);
        let event: FindEvent = serde_json::from_value(envelope.payload().clone()).unwrap();
        assert!(matches!(event, FindEvent::FindPosted(_)));
    }

    #[test]
    fn dispatch_rehydrates_before_handling() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<JsonValue>>> = Arc::new(InMemoryEventBus::new());
        let d = CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), bus);

        let find_id = FindId::new(AggregateId::new());
        d.dispatch::<Find>(find_id.0, "finds.find", post_cmd(find_id), |id| {
            Find::empty(FindId::new(id))
        })
        .unwrap();

        // Second post hits the rehydrated aggregate and fails its own guard.
        let err = d
            .dispatch::<Find>(find_id.0, "finds.find", post_cmd(find_id), |id| {
                Find::empty(FindId::new(id))
            })
            .unwrap_err();
        assert!(matches!(err, DispatchError::Concurrency(_)));
    }
}
