//! Conversation threads projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_finds::FindId;
use findermeister_messaging::{ThreadEvent, ThreadId};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadReadModel {
    pub thread_id: ThreadId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub messages: Vec<MessageRecord>,
    pub started_at: DateTime<Utc>,
}

impl ThreadReadModel {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.client_id == user_id || self.finder_id == user_id
    }
}

pub struct ThreadsProjection<S> {
    store: S,
}

impl<S> ThreadsProjection<S>
where
    S: ReadStore<ThreadId, ThreadReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "messaging.thread" {
            return Ok(());
        }

        let event: ThreadEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            ThreadEvent::Started(e) => {
                self.store.upsert(
                    e.thread_id,
                    ThreadReadModel {
                        thread_id: e.thread_id,
                        find_id: e.find_id,
                        client_id: e.client_id,
                        finder_id: e.finder_id,
                        messages: Vec::new(),
                        started_at: e.occurred_at,
                    },
                );
            }
            ThreadEvent::MessagePosted(e) => {
                if let Some(mut model) = self.store.get(&e.thread_id) {
                    model.messages.push(MessageRecord {
                        sender_id: e.sender_id,
                        body: e.body,
                        sent_at: e.sent_at,
                    });
                    self.store.upsert(e.thread_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, thread_id: &ThreadId) -> Option<ThreadReadModel> {
        self.store.get(thread_id)
    }

    pub fn list_for_user(&self, user_id: UserId) -> Vec<ThreadReadModel> {
        let mut threads: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.is_participant(user_id))
            .collect();
        threads.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        threads
    }
}
