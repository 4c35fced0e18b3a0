//! `findermeister-auth` — identity, roles and access-control decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage. It owns:
//! - the closed [`Role`] set and JWT claims model,
//! - session resolution (credential → [`Session`]),
//! - the role authorization gate (admit/redirect decisions),
//! - ban state and the user-facing ban notice,
//! - the event-sourced [`User`] aggregate (registration, bans, identity
//!   verification).
//!
//! The API layer is the authoritative enforcement point; everything here is a
//! pure decision, never a side effect.

pub mod ban;
pub mod claims;
pub mod gate;
pub mod jwt;
pub mod roles;
pub mod session;
pub mod user;

pub use ban::{BanNotice, BanSeverity, BanState};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use gate::{
    AgentGate, AuthorizationDecision, ProbeState, RedirectGuard, RoleRequirement, Route, admit,
    dashboard_for, is_payment_exempt,
};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use roles::Role;
pub use session::{ResolveError, Session, SessionResolver, SessionState, UserLookup};
pub use user::{
    BanUser, RegisterUser, ReviewVerification, SubmitVerification, UnbanUser, User, UserBanned,
    UserCommand, UserEvent, UserRegistered, UserUnbanned, VerificationReviewed,
    VerificationStatus, VerificationSubmitted, verification_steps,
};
