//! Finder token balance projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::UserId;
use findermeister_events::EventEnvelope;
use findermeister_proposals::TokenEvent;

use crate::read_model::ReadStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBalanceReadModel {
    pub finder_id: UserId,
    pub balance: u64,
    pub updated_at: DateTime<Utc>,
}

pub struct TokenBalancesProjection<S> {
    store: S,
}

impl<S> TokenBalancesProjection<S>
where
    S: ReadStore<UserId, TokenBalanceReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "proposals.tokens" {
            return Ok(());
        }

        let event: TokenEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            TokenEvent::Granted(e) => self.adjust(e.finder_id, e.amount as i64, e.occurred_at),
            TokenEvent::Consumed(e) => self.adjust(e.finder_id, -(e.amount as i64), e.occurred_at),
        }

        Ok(())
    }

    fn adjust(&self, finder_id: UserId, delta: i64, at: DateTime<Utc>) {
        let current = self.store.get(&finder_id).map(|m| m.balance).unwrap_or(0);
        // The aggregate rejects overdrafts; saturate here to stay safe on replay.
        let balance = if delta >= 0 {
            current.saturating_add(delta as u64)
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        self.store.upsert(
            finder_id,
            TokenBalanceReadModel {
                finder_id,
                balance,
                updated_at: at,
            },
        );
    }

    pub fn balance(&self, finder_id: &UserId) -> u64 {
        self.store.get(finder_id).map(|m| m.balance).unwrap_or(0)
    }

    pub fn get(&self, finder_id: &UserId) -> Option<TokenBalanceReadModel> {
        self.store.get(finder_id)
    }
}
