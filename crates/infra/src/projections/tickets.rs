//! Support tickets projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_support::{TicketEvent, TicketId, TicketSeverity, TicketStatus};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReply {
    pub replied_by: UserId,
    pub body: String,
    pub replied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReadModel {
    pub ticket_id: TicketId,
    pub opened_by: UserId,
    pub subject: String,
    pub severity: TicketSeverity,
    pub status: TicketStatus,
    pub replies: Vec<TicketReply>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct TicketsProjection<S> {
    store: S,
}

impl<S> TicketsProjection<S>
where
    S: ReadStore<TicketId, TicketReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "support.ticket" {
            return Ok(());
        }

        let event: TicketEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            TicketEvent::Opened(e) => {
                self.store.upsert(
                    e.ticket_id,
                    TicketReadModel {
                        ticket_id: e.ticket_id,
                        opened_by: e.opened_by,
                        subject: e.subject,
                        severity: e.severity,
                        status: TicketStatus::Open,
                        replies: Vec::new(),
                        opened_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            TicketEvent::Replied(e) => {
                if let Some(mut model) = self.store.get(&e.ticket_id) {
                    model.replies.push(TicketReply {
                        replied_by: e.replied_by,
                        body: e.body,
                        replied_at: e.occurred_at,
                    });
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.ticket_id, model);
                }
            }
            TicketEvent::Escalated(e) => {
                if let Some(mut model) = self.store.get(&e.ticket_id) {
                    model.severity = e.severity;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.ticket_id, model);
                }
            }
            TicketEvent::Resolved(e) => {
                if let Some(mut model) = self.store.get(&e.ticket_id) {
                    model.status = TicketStatus::Resolved;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.ticket_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, ticket_id: &TicketId) -> Option<TicketReadModel> {
        self.store.get(ticket_id)
    }

    pub fn list(&self) -> Vec<TicketReadModel> {
        let mut tickets = self.store.list();
        tickets.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        tickets
    }

    pub fn list_for_user(&self, user_id: UserId) -> Vec<TicketReadModel> {
        self.list()
            .into_iter()
            .filter(|t| t.opened_by == user_id)
            .collect()
    }
}
