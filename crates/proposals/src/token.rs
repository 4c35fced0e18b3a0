//! FinderToken ledger: metered proposal credits, one account per finder.
//!
//! Grants add credits (a purchase grant from the API, or an admin top-up);
//! each proposal submission consumes [`PROPOSAL_TOKEN_COST`]. No settlement
//! logic lives here — the account only tracks a balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;

/// Tokens consumed per proposal submission.
pub const PROPOSAL_TOKEN_COST: u64 = 1;

/// Namespace for deriving token-account stream ids from finder ids.
const TOKEN_ACCOUNT_NAMESPACE: Uuid = Uuid::from_u128(0x8f1a_c2d4_5e6b_4a7c_9d0e_1f2a_3b4c_5d6e);

/// Stream id for a finder's token account.
///
/// Derived (uuid v5) rather than reusing the finder's own id: the account is
/// a separate aggregate and must not share an event stream with the user.
pub fn token_account_id(finder_id: UserId) -> AggregateId {
    AggregateId::from_uuid(Uuid::new_v5(
        &TOKEN_ACCOUNT_NAMESPACE,
        finder_id.as_uuid().as_bytes(),
    ))
}

/// Aggregate root: a finder's token balance. Keyed by the finder's `UserId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAccount {
    finder_id: UserId,
    balance: u64,
    version: u64,
}

impl TokenAccount {
    /// A fresh account starts at zero balance; no explicit creation event.
    pub fn empty(finder_id: UserId) -> Self {
        Self {
            finder_id,
            balance: 0,
            version: 0,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }
}

impl AggregateRoot for TokenAccount {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.finder_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: GrantTokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTokens {
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConsumeTokens (rejected when the balance is insufficient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeTokens {
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenCommand {
    Grant(GrantTokens),
    Consume(ConsumeTokens),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensGranted {
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokensConsumed {
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenEvent {
    Granted(TokensGranted),
    Consumed(TokensConsumed),
}

impl Event for TokenEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TokenEvent::Granted(_) => "proposals.tokens.granted",
            TokenEvent::Consumed(_) => "proposals.tokens.consumed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TokenEvent::Granted(e) => e.occurred_at,
            TokenEvent::Consumed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for TokenAccount {
    type Command = TokenCommand;
    type Event = TokenEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TokenEvent::Granted(e) => {
                self.balance = self.balance.saturating_add(e.amount);
            }
            TokenEvent::Consumed(e) => {
                self.balance = self.balance.saturating_sub(e.amount);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TokenCommand::Grant(cmd) => {
                if cmd.amount == 0 {
                    return Err(DomainError::validation("grant amount must be positive"));
                }
                Ok(vec![TokenEvent::Granted(TokensGranted {
                    finder_id: cmd.finder_id,
                    amount: cmd.amount,
                    occurred_at: cmd.occurred_at,
                })])
            }
            TokenCommand::Consume(cmd) => {
                if cmd.amount == 0 {
                    return Err(DomainError::validation("consume amount must be positive"));
                }
                if self.balance < cmd.amount {
                    return Err(DomainError::invariant(format!(
                        "insufficient token balance (have {}, need {})",
                        self.balance, cmd.amount
                    )));
                }
                Ok(vec![TokenEvent::Consumed(TokensConsumed {
                    finder_id: cmd.finder_id,
                    amount: cmd.amount,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_rejects_insufficient_balance() {
        let finder_id = UserId::new();
        let account = TokenAccount::empty(finder_id);
        let err = account
            .handle(&TokenCommand::Consume(ConsumeTokens {
                finder_id,
                amount: PROPOSAL_TOKEN_COST,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn grant_then_consume_tracks_balance() {
        let finder_id = UserId::new();
        let mut account = TokenAccount::empty(finder_id);

        for e in &account
            .handle(&TokenCommand::Grant(GrantTokens {
                finder_id,
                amount: 3,
                occurred_at: Utc::now(),
            }))
            .unwrap()
        {
            account.apply(e);
        }
        assert_eq!(account.balance(), 3);

        for e in &account
            .handle(&TokenCommand::Consume(ConsumeTokens {
                finder_id,
                amount: 1,
                occurred_at: Utc::now(),
            }))
            .unwrap()
        {
            account.apply(e);
        }
        assert_eq!(account.balance(), 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a consume never succeeds beyond the granted total.
            #[test]
            fn balance_never_goes_negative(grants in 0u64..100, spends in 0u64..200) {
                let finder_id = UserId::new();
                let mut account = TokenAccount::empty(finder_id);

                if grants > 0 {
                    for e in &account.handle(&TokenCommand::Grant(GrantTokens {
                        finder_id,
                        amount: grants,
                        occurred_at: Utc::now(),
                    })).unwrap() {
                        account.apply(e);
                    }
                }

                let mut spent = 0u64;
                for _ in 0..spends {
                    let result = account.handle(&TokenCommand::Consume(ConsumeTokens {
                        finder_id,
                        amount: 1,
                        occurred_at: Utc::now(),
                    }));
                    match result {
                        Ok(events) => {
                            for e in &events {
                                account.apply(e);
                            }
                            spent += 1;
                        }
                        Err(_) => break,
                    }
                }

                prop_assert!(spent <= grants);
                prop_assert_eq!(account.balance(), grants - spent);
            }
        }
    }
}
