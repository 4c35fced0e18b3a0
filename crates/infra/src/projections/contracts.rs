//! Contracts projection, including the escrow tracker view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_contracts::{ContractEvent, ContractId, EscrowStatus, escrow_steps};
use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_finds::FindId;

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractReadModel {
    pub contract_id: ContractId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub amount: u64,
    pub status: EscrowStatus,
    pub has_submission: bool,
    pub is_completed: bool,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContractReadModel {
    /// Step-completion flags for the escrow progress display.
    pub fn escrow_steps(&self) -> [bool; 4] {
        escrow_steps(self.status, self.has_submission, self.is_completed)
    }

    pub fn is_party(&self, user_id: UserId) -> bool {
        self.client_id == user_id || self.finder_id == user_id
    }
}

pub struct ContractsProjection<S> {
    store: S,
}

impl<S> ContractsProjection<S>
where
    S: ReadStore<ContractId, ContractReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "contracts.contract" {
            return Ok(());
        }

        let event: ContractEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            ContractEvent::Opened(e) => {
                self.store.upsert(
                    e.contract_id,
                    ContractReadModel {
                        contract_id: e.contract_id,
                        find_id: e.find_id,
                        client_id: e.client_id,
                        finder_id: e.finder_id,
                        amount: e.amount,
                        status: EscrowStatus::Held,
                        has_submission: false,
                        is_completed: false,
                        opened_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ContractEvent::WorkStarted(e) => {
                self.update(e.contract_id, e.occurred_at, |m| {
                    m.status = EscrowStatus::InProgress;
                });
            }
            ContractEvent::WorkSubmitted(e) => {
                self.update(e.contract_id, e.occurred_at, |m| {
                    m.has_submission = true;
                });
            }
            ContractEvent::WorkCompleted(e) => {
                self.update(e.contract_id, e.occurred_at, |m| {
                    m.status = EscrowStatus::Completed;
                    m.is_completed = true;
                });
            }
            ContractEvent::EscrowReleased(e) => {
                self.update(e.contract_id, e.occurred_at, |m| {
                    m.status = EscrowStatus::Released;
                });
            }
        }

        Ok(())
    }

    fn update(
        &self,
        contract_id: ContractId,
        at: DateTime<Utc>,
        f: impl FnOnce(&mut ContractReadModel),
    ) {
        if let Some(mut model) = self.store.get(&contract_id) {
            f(&mut model);
            model.updated_at = at;
            self.store.upsert(contract_id, model);
        }
    }

    pub fn get(&self, contract_id: &ContractId) -> Option<ContractReadModel> {
        self.store.get(contract_id)
    }

    pub fn list_for_user(&self, user_id: UserId) -> Vec<ContractReadModel> {
        let mut contracts: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|c| c.is_party(user_id))
            .collect();
        contracts.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        contracts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use findermeister_core::AggregateId;
    use std::sync::Arc;
    use uuid::Uuid;

    fn envelope(contract_id: ContractId, event: &ContractEvent) -> EventEnvelope<serde_json::Value> {
        EventEnvelope::new(
            Uuid::now_v7(),
            contract_id.0,
            "contracts.contract",
            1,
            serde_json::to_value(event).unwrap(),
        )
    }

    #[test]
    fn completed_contract_shows_final_step_before_release() {
        let projection = ContractsProjection::new(Arc::new(InMemoryReadStore::new()));
        let contract_id = ContractId::new(AggregateId::new());

        let events = [
            ContractEvent::Opened(findermeister_contracts::ContractOpened {
                contract_id,
                find_id: FindId::new(AggregateId::new()),
                client_id: UserId::new(),
                finder_id: UserId::new(),
                amount: 900,
                occurred_at: Utc::now(),
            }),
            ContractEvent::WorkStarted(findermeister_contracts::WorkStarted {
                contract_id,
                occurred_at: Utc::now(),
            }),
            ContractEvent::WorkSubmitted(findermeister_contracts::WorkSubmitted {
                contract_id,
                note: "delivered".to_string(),
                occurred_at: Utc::now(),
            }),
            ContractEvent::WorkCompleted(findermeister_contracts::WorkCompleted {
                contract_id,
                occurred_at: Utc::now(),
            }),
        ];
        for e in &events {
            projection.apply_envelope(&envelope(contract_id, e)).unwrap();
        }

        let model = projection.get(&contract_id).unwrap();
        assert_eq!(model.status, EscrowStatus::Completed);
        assert_eq!(model.escrow_steps(), [true, true, true, true]);
    }
}
