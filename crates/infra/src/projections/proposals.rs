//! Proposals projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_finds::FindId;
use findermeister_proposals::{ProposalEvent, ProposalId, ProposalStatus};

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalReadModel {
    pub proposal_id: ProposalId,
    pub find_id: FindId,
    pub finder_id: UserId,
    pub message: String,
    pub price: u64,
    pub status: ProposalStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProposalsProjection<S> {
    store: S,
}

impl<S> ProposalsProjection<S>
where
    S: ReadStore<ProposalId, ProposalReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "proposals.proposal" {
            return Ok(());
        }

        let event: ProposalEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            ProposalEvent::Submitted(e) => {
                self.store.upsert(
                    e.proposal_id,
                    ProposalReadModel {
                        proposal_id: e.proposal_id,
                        find_id: e.find_id,
                        finder_id: e.finder_id,
                        message: e.message,
                        price: e.price,
                        status: ProposalStatus::Pending,
                        submitted_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ProposalEvent::Accepted(e) => {
                self.set_status(e.proposal_id, ProposalStatus::Accepted, e.occurred_at)
            }
            ProposalEvent::Rejected(e) => {
                self.set_status(e.proposal_id, ProposalStatus::Rejected, e.occurred_at)
            }
            ProposalEvent::Withdrawn(e) => {
                self.set_status(e.proposal_id, ProposalStatus::Withdrawn, e.occurred_at)
            }
        }

        Ok(())
    }

    fn set_status(&self, proposal_id: ProposalId, status: ProposalStatus, at: DateTime<Utc>) {
        if let Some(mut model) = self.store.get(&proposal_id) {
            model.status = status;
            model.updated_at = at;
            self.store.upsert(proposal_id, model);
        }
    }

    pub fn get(&self, proposal_id: &ProposalId) -> Option<ProposalReadModel> {
        self.store.get(proposal_id)
    }

    pub fn list_for_find(&self, find_id: FindId) -> Vec<ProposalReadModel> {
        let mut proposals: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|p| p.find_id == find_id)
            .collect();
        proposals.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        proposals
    }

    pub fn list_for_finder(&self, finder_id: UserId) -> Vec<ProposalReadModel> {
        let mut proposals: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|p| p.finder_id == finder_id)
            .collect();
        proposals.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        proposals
    }
}
