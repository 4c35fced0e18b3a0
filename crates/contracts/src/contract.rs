use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;
use findermeister_finds::FindId;

/// Contract identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(pub AggregateId);

impl ContractId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ContractId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Escrow lifecycle, forward-only. `Released` implies work was completed,
/// which implies a submission exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    Held,
    InProgress,
    Completed,
    Released,
}

/// Aggregate root: a hired engagement between a client and a finder, with
/// the agreed amount tracked under escrow status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    id: ContractId,
    find_id: FindId,
    client_id: UserId,
    finder_id: UserId,
    amount: u64,
    status: EscrowStatus,
    has_submission: bool,
    is_completed: bool,
    version: u64,
    created: bool,
}

impl Contract {
    pub fn empty(id: ContractId) -> Self {
        Self {
            id,
            find_id: FindId::new(AggregateId::from_uuid(uuid::Uuid::nil())),
            client_id: UserId::from_uuid(uuid::Uuid::nil()),
            finder_id: UserId::from_uuid(uuid::Uuid::nil()),
            amount: 0,
            status: EscrowStatus::Held,
            has_submission: false,
            is_completed: false,
            version: 0,
            created: false,
        }
    }

    pub fn find_id(&self) -> FindId {
        self.find_id
    }

    pub fn client_id(&self) -> UserId {
        self.client_id
    }

    pub fn finder_id(&self) -> UserId {
        self.finder_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn status(&self) -> EscrowStatus {
        self.status
    }

    pub fn has_submission(&self) -> bool {
        self.has_submission
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }
}

impl AggregateRoot for Contract {
    type Id = ContractId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: OpenContract. Escrow starts `Held`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenContract {
    pub contract_id: ContractId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartWork (finder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWork {
    pub contract_id: ContractId,
    pub finder_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitWork (finder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitWork {
    pub contract_id: ContractId,
    pub finder_id: UserId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteWork (client accepts the submission).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteWork {
    pub contract_id: ContractId,
    pub client_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReleaseEscrow (client). Records the release decision only; no
/// money moves here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEscrow {
    pub contract_id: ContractId,
    pub client_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractCommand {
    Open(OpenContract),
    StartWork(StartWork),
    SubmitWork(SubmitWork),
    CompleteWork(CompleteWork),
    ReleaseEscrow(ReleaseEscrow),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOpened {
    pub contract_id: ContractId,
    pub find_id: FindId,
    pub client_id: UserId,
    pub finder_id: UserId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStarted {
    pub contract_id: ContractId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkSubmitted {
    pub contract_id: ContractId,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCompleted {
    pub contract_id: ContractId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReleased {
    pub contract_id: ContractId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    Opened(ContractOpened),
    WorkStarted(WorkStarted),
    WorkSubmitted(WorkSubmitted),
    WorkCompleted(WorkCompleted),
    EscrowReleased(EscrowReleased),
}

impl Event for ContractEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ContractEvent::Opened(_) => "contracts.contract.opened",
            ContractEvent::WorkStarted(_) => "contracts.contract.work_started",
            ContractEvent::WorkSubmitted(_) => "contracts.contract.work_submitted",
            ContractEvent::WorkCompleted(_) => "contracts.contract.work_completed",
            ContractEvent::EscrowReleased(_) => "contracts.contract.escrow_released",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ContractEvent::Opened(e) => e.occurred_at,
            ContractEvent::WorkStarted(e) => e.occurred_at,
            ContractEvent::WorkSubmitted(e) => e.occurred_at,
            ContractEvent::WorkCompleted(e) => e.occurred_at,
            ContractEvent::EscrowReleased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Contract {
    type Command = ContractCommand;
    type Event = ContractEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ContractEvent::Opened(e) => {
                self.id = e.contract_id;
                self.find_id = e.find_id;
                self.client_id = e.client_id;
                self.finder_id = e.finder_id;
                self.amount = e.amount;
                self.status = EscrowStatus::Held;
                self.created = true;
            }
            ContractEvent::WorkStarted(_) => self.status = EscrowStatus::InProgress,
            ContractEvent::WorkSubmitted(_) => self.has_submission = true,
            ContractEvent::WorkCompleted(_) => {
                self.status = EscrowStatus::Completed;
                self.is_completed = true;
            }
            ContractEvent::EscrowReleased(_) => self.status = EscrowStatus::Released,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ContractCommand::Open(cmd) => self.handle_open(cmd),
            ContractCommand::StartWork(cmd) => self.handle_start(cmd),
            ContractCommand::SubmitWork(cmd) => self.handle_submit(cmd),
            ContractCommand::CompleteWork(cmd) => self.handle_complete(cmd),
            ContractCommand::ReleaseEscrow(cmd) => self.handle_release(cmd),
        }
    }
}

impl Contract {
    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_finder(&self, finder_id: UserId) -> Result<(), DomainError> {
        if self.finder_id != finder_id {
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    fn ensure_client(&self, client_id: UserId) -> Result<(), DomainError> {
        if self.client_id != client_id {
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    fn handle_open(&self, cmd: &OpenContract) -> Result<Vec<ContractEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("contract already opened"));
        }
        if cmd.amount == 0 {
            return Err(DomainError::validation("contract amount must be positive"));
        }
        if cmd.client_id == cmd.finder_id {
            return Err(DomainError::validation(
                "client and finder must be different users",
            ));
        }

        Ok(vec![ContractEvent::Opened(ContractOpened {
            contract_id: cmd.contract_id,
            find_id: cmd.find_id,
            client_id: cmd.client_id,
            finder_id: cmd.finder_id,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start(&self, cmd: &StartWork) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_finder(cmd.finder_id)?;
        if self.status != EscrowStatus::Held {
            return Err(DomainError::conflict("work already started"));
        }

        Ok(vec![ContractEvent::WorkStarted(WorkStarted {
            contract_id: cmd.contract_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitWork) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_finder(cmd.finder_id)?;
        if self.status != EscrowStatus::InProgress {
            return Err(DomainError::conflict(
                "work can only be submitted while in progress",
            ));
        }
        if cmd.note.trim().is_empty() {
            return Err(DomainError::validation("submission note cannot be empty"));
        }

        Ok(vec![ContractEvent::WorkSubmitted(WorkSubmitted {
            contract_id: cmd.contract_id,
            note: cmd.note.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteWork) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_client(cmd.client_id)?;
        if self.status != EscrowStatus::InProgress {
            return Err(DomainError::conflict(
                "only an in-progress contract can be completed",
            ));
        }
        if !self.has_submission {
            return Err(DomainError::invariant(
                "cannot complete a contract with no submitted work",
            ));
        }

        Ok(vec![ContractEvent::WorkCompleted(WorkCompleted {
            contract_id: cmd.contract_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_release(&self, cmd: &ReleaseEscrow) -> Result<Vec<ContractEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_client(cmd.client_id)?;
        if self.status != EscrowStatus::Completed {
            return Err(DomainError::conflict(
                "escrow can only be released after completion",
            ));
        }

        Ok(vec![ContractEvent::EscrowReleased(EscrowReleased {
            contract_id: cmd.contract_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drive(contract: &mut Contract, cmd: ContractCommand) -> Result<(), DomainError> {
        let events = contract.handle(&cmd)?;
        for e in &events {
            contract.apply(e);
        }
        Ok(())
    }

    fn opened() -> (Contract, UserId, UserId) {
        let id = ContractId::new(AggregateId::new());
        let client = UserId::new();
        let finder = UserId::new();
        let mut c = Contract::empty(id);
        drive(
            &mut c,
            ContractCommand::Open(OpenContract {
                contract_id: id,
                find_id: FindId::new(AggregateId::new()),
                client_id: client,
                finder_id: finder,
                amount: 500,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (c, client, finder)
    }

    fn at_submitted() -> (Contract, UserId, UserId) {
        let (mut c, client, finder) = opened();
        let id = *c.id();
        drive(
            &mut c,
            ContractCommand::StartWork(StartWork {
                contract_id: id,
                finder_id: finder,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        drive(
            &mut c,
            ContractCommand::SubmitWork(SubmitWork {
                contract_id: id,
                finder_id: finder,
                note: "found the part, photos attached".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        (c, client, finder)
    }

    #[test]
    fn open_rejects_client_hiring_themselves() {
        let id = ContractId::new(AggregateId::new());
        let who = UserId::new();
        let c = Contract::empty(id);
        let err = c
            .handle(&ContractCommand::Open(OpenContract {
                contract_id: id,
                find_id: FindId::new(AggregateId::new()),
                client_id: who,
                finder_id: who,
                amount: 100,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn complete_requires_a_submission() {
        let (mut c, client, finder) = opened();
        let id = *c.id();
        drive(
            &mut c,
            ContractCommand::StartWork(StartWork {
                contract_id: id,
                finder_id: finder,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let err = c
            .handle(&ContractCommand::CompleteWork(CompleteWork {
                contract_id: id,
                client_id: client,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn release_requires_completion_first() {
        let (c, client, _) = at_submitted();
        let err = c
            .handle(&ContractCommand::ReleaseEscrow(ReleaseEscrow {
                contract_id: *c.id(),
                client_id: client,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn only_the_hiring_client_may_release() {
        let (mut c, client, _) = at_submitted();
        let id = *c.id();
        drive(
            &mut c,
            ContractCommand::CompleteWork(CompleteWork {
                contract_id: id,
                client_id: client,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        let err = c
            .handle(&ContractCommand::ReleaseEscrow(ReleaseEscrow {
                contract_id: id,
                client_id: UserId::new(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);
    }

    #[test]
    fn full_lifecycle_ends_released() {
        let (mut c, client, _) = at_submitted();
        let id = *c.id();
        drive(
            &mut c,
            ContractCommand::CompleteWork(CompleteWork {
                contract_id: id,
                client_id: client,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        drive(
            &mut c,
            ContractCommand::ReleaseEscrow(ReleaseEscrow {
                contract_id: id,
                client_id: client,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();

        assert_eq!(c.status(), EscrowStatus::Released);
        assert!(c.is_completed());
        assert!(c.has_submission());
        assert_eq!(c.version(), 5);
    }

    proptest! {
        #[test]
        fn handle_is_deterministic(amount in 1u64..1_000_000) {
            let id = ContractId::new(AggregateId::new());
            let cmd = ContractCommand::Open(OpenContract {
                contract_id: id,
                find_id: FindId::new(AggregateId::new()),
                client_id: UserId::new(),
                finder_id: UserId::new(),
                amount,
                occurred_at: Utc::now(),
            });
            let c = Contract::empty(id);
            prop_assert_eq!(c.handle(&cmd), c.handle(&cmd));
        }
    }
}
