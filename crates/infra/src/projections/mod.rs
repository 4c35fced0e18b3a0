//! Event-driven projections building disposable read models.
//!
//! Each projection filters envelopes by aggregate type, deserializes the
//! payload into the domain event type, and folds it into a keyed read store.
//! All handlers are idempotent (last-write-wins upserts), so at-least-once
//! delivery from the bus is safe.

pub mod contracts;
pub mod finds;
pub mod proposals;
pub mod threads;
pub mod tickets;
pub mod tokens;
pub mod users;

pub use contracts::{ContractReadModel, ContractsProjection};
pub use finds::{FindReadModel, FindsProjection};
pub use proposals::{ProposalReadModel, ProposalsProjection};
pub use threads::{MessageRecord, ThreadReadModel, ThreadsProjection};
pub use tickets::{TicketReadModel, TicketReply, TicketsProjection};
pub use tokens::{TokenBalanceReadModel, TokenBalancesProjection};
pub use users::{UserReadModel, UsersProjection};
