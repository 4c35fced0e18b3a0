//! Proposals domain module (finder bids on finds, event-sourced).
//!
//! Submitting a proposal costs one FinderToken; the token ledger lives here
//! too ([`token`]) as its own small aggregate, one account per finder.

pub mod proposal;
pub mod token;

pub use proposal::{
    AcceptProposal, Proposal, ProposalAccepted, ProposalCommand, ProposalEvent, ProposalId,
    ProposalRejected, ProposalStatus, ProposalSubmitted, ProposalWithdrawn, RejectProposal,
    SubmitProposal, WithdrawProposal,
};
pub use token::{
    ConsumeTokens, GrantTokens, TokenAccount, TokenCommand, TokenEvent, TokensConsumed,
    TokensGranted, PROPOSAL_TOKEN_COST, token_account_id,
};
