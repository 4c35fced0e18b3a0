use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;
use findermeister_finds::FindId;

/// Proposal identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(pub AggregateId);

impl ProposalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProposalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Proposal lifecycle. Accepted/Rejected/Withdrawn are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

/// Aggregate root: a finder's bid on a find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    id: ProposalId,
    find_id: FindId,
    finder_id: UserId,
    message: String,
    price: u64,
    status: ProposalStatus,
    version: u64,
    created: bool,
}

impl Proposal {
    pub fn empty(id: ProposalId) -> Self {
        Self {
            id,
            find_id: FindId::new(AggregateId::from_uuid(uuid::Uuid::nil())),
            finder_id: UserId::from_uuid(uuid::Uuid::nil()),
            message: String::new(),
            price: 0,
            status: ProposalStatus::Pending,
            version: 0,
            created: false,
        }
    }

    pub fn find_id(&self) -> FindId {
        self.find_id
    }

    pub fn finder_id(&self) -> UserId {
        self.finder_id
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn status(&self) -> ProposalStatus {
        self.status
    }
}

impl AggregateRoot for Proposal {
    type Id = ProposalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitProposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitProposal {
    pub proposal_id: ProposalId,
    pub find_id: FindId,
    pub finder_id: UserId,
    pub message: String,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptProposal (client decision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptProposal {
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RejectProposal (client decision).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectProposal {
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawProposal (finder retracts their own bid).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawProposal {
    pub proposal_id: ProposalId,
    pub finder_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalCommand {
    Submit(SubmitProposal),
    Accept(AcceptProposal),
    Reject(RejectProposal),
    Withdraw(WithdrawProposal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSubmitted {
    pub proposal_id: ProposalId,
    pub find_id: FindId,
    pub finder_id: UserId,
    pub message: String,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAccepted {
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRejected {
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalWithdrawn {
    pub proposal_id: ProposalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalEvent {
    Submitted(ProposalSubmitted),
    Accepted(ProposalAccepted),
    Rejected(ProposalRejected),
    Withdrawn(ProposalWithdrawn),
}

impl Event for ProposalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProposalEvent::Submitted(_) => "proposals.proposal.submitted",
            ProposalEvent::Accepted(_) => "proposals.proposal.accepted",
            ProposalEvent::Rejected(_) => "proposals.proposal.rejected",
            ProposalEvent::Withdrawn(_) => "proposals.proposal.withdrawn",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProposalEvent::Submitted(e) => e.occurred_at,
            ProposalEvent::Accepted(e) => e.occurred_at,
            ProposalEvent::Rejected(e) => e.occurred_at,
            ProposalEvent::Withdrawn(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Proposal {
    type Command = ProposalCommand;
    type Event = ProposalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProposalEvent::Submitted(e) => {
                self.id = e.proposal_id;
                self.find_id = e.find_id;
                self.finder_id = e.finder_id;
                self.message = e.message.clone();
                self.price = e.price;
                self.status = ProposalStatus::Pending;
                self.created = true;
            }
            ProposalEvent::Accepted(_) => self.status = ProposalStatus::Accepted,
            ProposalEvent::Rejected(_) => self.status = ProposalStatus::Rejected,
            ProposalEvent::Withdrawn(_) => self.status = ProposalStatus::Withdrawn,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProposalCommand::Submit(cmd) => self.handle_submit(cmd),
            ProposalCommand::Accept(cmd) => self.handle_accept(cmd),
            ProposalCommand::Reject(cmd) => self.handle_reject(cmd),
            ProposalCommand::Withdraw(cmd) => self.handle_withdraw(cmd),
        }
    }
}

impl Proposal {
    fn ensure_pending(&self) -> Result<(), DomainError> {
        if self.status != ProposalStatus::Pending {
            return Err(DomainError::conflict("proposal is no longer pending"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitProposal) -> Result<Vec<ProposalEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("proposal already submitted"));
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("proposal message cannot be empty"));
        }
        if cmd.price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(vec![ProposalEvent::Submitted(ProposalSubmitted {
            proposal_id: cmd.proposal_id,
            find_id: cmd.find_id,
            finder_id: cmd.finder_id,
            message: cmd.message.clone(),
            price: cmd.price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptProposal) -> Result<Vec<ProposalEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_pending()?;

        Ok(vec![ProposalEvent::Accepted(ProposalAccepted {
            proposal_id: cmd.proposal_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reject(&self, cmd: &RejectProposal) -> Result<Vec<ProposalEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_pending()?;

        Ok(vec![ProposalEvent::Rejected(ProposalRejected {
            proposal_id: cmd.proposal_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawProposal) -> Result<Vec<ProposalEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.finder_id != cmd.finder_id {
            return Err(DomainError::Unauthorized);
        }
        self.ensure_pending()?;

        Ok(vec![ProposalEvent::Withdrawn(ProposalWithdrawn {
            proposal_id: cmd.proposal_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(id: ProposalId, finder_id: UserId) -> Proposal {
        let mut p = Proposal::empty(id);
        let events = p
            .handle(&ProposalCommand::Submit(SubmitProposal {
                proposal_id: id,
                find_id: FindId::new(AggregateId::new()),
                finder_id,
                message: "I can source this within a week".to_string(),
                price: 120,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            p.apply(e);
        }
        p
    }

    #[test]
    fn submit_rejects_zero_price() {
        let id = ProposalId::new(AggregateId::new());
        let p = Proposal::empty(id);
        let err = p
            .handle(&ProposalCommand::Submit(SubmitProposal {
                proposal_id: id,
                find_id: FindId::new(AggregateId::new()),
                finder_id: UserId::new(),
                message: "free".to_string(),
                price: 0,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn accept_is_terminal() {
        let id = ProposalId::new(AggregateId::new());
        let mut p = submitted(id, UserId::new());

        let events = p
            .handle(&ProposalCommand::Accept(AcceptProposal {
                proposal_id: id,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        for e in &events {
            p.apply(e);
        }
        assert_eq!(p.status(), ProposalStatus::Accepted);

        let err = p
            .handle(&ProposalCommand::Reject(RejectProposal {
                proposal_id: id,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn only_the_submitting_finder_may_withdraw() {
        let id = ProposalId::new(AggregateId::new());
        let p = submitted(id, UserId::new());

        let err = p
            .handle(&ProposalCommand::Withdraw(WithdrawProposal {
                proposal_id: id,
                finder_id: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }
}
