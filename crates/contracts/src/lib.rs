//! Contracts domain module (hired work under escrow, event-sourced).
//!
//! Escrow here is status tracking: `held → in_progress → completed →
//! released`, forward-only. No settlement engine exists — releasing escrow
//! records the decision, it moves no money.

pub mod contract;
pub mod tracker;

pub use contract::{
    CompleteWork, Contract, ContractCommand, ContractEvent, ContractId, ContractOpened,
    EscrowReleased, EscrowStatus, OpenContract, ReleaseEscrow, StartWork, SubmitWork,
    WorkCompleted, WorkStarted, WorkSubmitted,
};
pub use tracker::escrow_steps;
