//! Finds catalog projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_finds::{FindEvent, FindId, FindStatus};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindReadModel {
    pub find_id: FindId,
    pub client_id: UserId,
    pub title: String,
    pub description: String,
    pub budget: Option<u64>,
    pub status: FindStatus,
    pub posted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct FindsProjection<S> {
    store: S,
}

impl<S> FindsProjection<S>
where
    S: ReadStore<FindId, FindReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "finds.find" {
            return Ok(());
        }

        let event: FindEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            FindEvent::FindPosted(e) => {
                self.store.upsert(
                    e.find_id,
                    FindReadModel {
                        find_id: e.find_id,
                        client_id: e.client_id,
                        title: e.title,
                        description: e.description,
                        budget: e.budget,
                        status: FindStatus::Open,
                        posted_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            FindEvent::FindUpdated(e) => {
                if let Some(mut model) = self.store.get(&e.find_id) {
                    model.title = e.title;
                    model.description = e.description;
                    model.budget = e.budget;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.find_id, model);
                }
            }
            FindEvent::FindClosed(e) => {
                if let Some(mut model) = self.store.get(&e.find_id) {
                    model.status = FindStatus::Closed;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.find_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, find_id: &FindId) -> Option<FindReadModel> {
        self.store.get(find_id)
    }

    pub fn list(&self) -> Vec<FindReadModel> {
        let mut finds = self.store.list();
        finds.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        finds
    }
}
