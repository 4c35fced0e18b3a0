//! User aggregate: registration, bans and identity verification
//! (event-sourced).
//!
//! # Invariants
//! - A user registers exactly once; email and role are fixed at registration.
//! - Ban reason/severity/timestamp exist iff the account is banned
//!   (`Option<BanState>`); ban and unban set/clear the whole state together.
//! - Verification status only moves forward: `Unsubmitted → Pending →
//!   Verified | Rejected`; a rejected user may resubmit (back to `Pending`).
//! - Banned accounts cannot submit verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_core::{Aggregate, AggregateRoot, DomainError, UserId};
use findermeister_events::Event;

use crate::ban::{BanSeverity, BanState};
use crate::roles::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Verification
// ─────────────────────────────────────────────────────────────────────────────

/// Identity verification lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Unsubmitted,
    Pending,
    Verified,
    Rejected,
}

/// Step-completion flags for the verification progress display.
///
/// Pure function of status; no transitions happen here.
pub fn verification_steps(status: VerificationStatus) -> [bool; 4] {
    let submitted = status != VerificationStatus::Unsubmitted;
    let reviewed = matches!(
        status,
        VerificationStatus::Verified | VerificationStatus::Rejected
    );
    let verified = status == VerificationStatus::Verified;
    [true, submitted, reviewed, verified]
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    email: String,
    display_name: String,
    role: Role,
    ban: Option<BanState>,
    verification: VerificationStatus,
    version: u64,
    created: bool,
}

impl User {
    /// Create an empty, not-yet-registered instance for rehydration.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            display_name: String::new(),
            role: Role::Client,
            ban: None,
            verification: VerificationStatus::Unsubmitted,
            version: 0,
            created: false,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn ban(&self) -> Option<&BanState> {
        self.ban.as_ref()
    }

    pub fn is_banned(&self) -> bool {
        self.ban.is_some()
    }

    pub fn verification(&self) -> VerificationStatus {
        self.verification
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

/// Admin-only: suspend the account with a reason and severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanUser {
    pub user_id: UserId,
    pub reason: String,
    pub severity: BanSeverity,
    pub occurred_at: DateTime<Utc>,
}

/// Admin-only: lift a ban, clearing reason/severity/timestamp together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbanUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitVerification {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerification {
    pub user_id: UserId,
    pub approve: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    Ban(BanUser),
    Unban(UnbanUser),
    SubmitVerification(SubmitVerification),
    ReviewVerification(ReviewVerification),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBanned {
    pub user_id: UserId,
    pub reason: String,
    pub severity: BanSeverity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnbanned {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSubmitted {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReviewed {
    pub user_id: UserId,
    pub approved: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    Banned(UserBanned),
    Unbanned(UserUnbanned),
    VerificationSubmitted(VerificationSubmitted),
    VerificationReviewed(VerificationReviewed),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::Banned(_) => "auth.user.banned",
            UserEvent::Unbanned(_) => "auth.user.unbanned",
            UserEvent::VerificationSubmitted(_) => "auth.user.verification_submitted",
            UserEvent::VerificationReviewed(_) => "auth.user.verification_reviewed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::Banned(e) => e.occurred_at,
            UserEvent::Unbanned(e) => e.occurred_at,
            UserEvent::VerificationSubmitted(e) => e.occurred_at,
            UserEvent::VerificationReviewed(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.email = e.email.clone();
                self.display_name = e.display_name.clone();
                self.role = e.role;
                self.ban = None;
                self.verification = VerificationStatus::Unsubmitted;
                self.created = true;
            }
            UserEvent::Banned(e) => {
                self.ban = Some(BanState {
                    reason: e.reason.clone(),
                    severity: e.severity,
                    banned_at: e.occurred_at,
                });
            }
            UserEvent::Unbanned(_) => {
                self.ban = None;
            }
            UserEvent::VerificationSubmitted(_) => {
                self.verification = VerificationStatus::Pending;
            }
            UserEvent::VerificationReviewed(e) => {
                self.verification = if e.approved {
                    VerificationStatus::Verified
                } else {
                    VerificationStatus::Rejected
                };
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::Ban(cmd) => self.handle_ban(cmd),
            UserCommand::Unban(cmd) => self.handle_unban(cmd),
            UserCommand::SubmitVerification(cmd) => self.handle_submit_verification(cmd),
            UserCommand::ReviewVerification(cmd) => self.handle_review_verification(cmd),
        }
    }
}

impl User {
    fn ensure_user_id(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.id != user_id {
            return Err(DomainError::invariant("user_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already registered"));
        }

        if cmd.email.trim().is_empty() || !cmd.email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if cmd.display_name.trim().is_empty() {
            return Err(DomainError::validation("display name cannot be empty"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            email: cmd.email.trim().to_lowercase(),
            display_name: cmd.display_name.trim().to_string(),
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_ban(&self, cmd: &BanUser) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_user_id(cmd.user_id)?;

        if self.ban.is_some() {
            return Err(DomainError::conflict("user is already banned"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("ban reason cannot be empty"));
        }

        Ok(vec![UserEvent::Banned(UserBanned {
            user_id: cmd.user_id,
            reason: cmd.reason.trim().to_string(),
            severity: cmd.severity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unban(&self, cmd: &UnbanUser) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_user_id(cmd.user_id)?;

        if self.ban.is_none() {
            return Err(DomainError::conflict("user is not banned"));
        }

        Ok(vec![UserEvent::Unbanned(UserUnbanned {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit_verification(
        &self,
        cmd: &SubmitVerification,
    ) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_user_id(cmd.user_id)?;

        if self.ban.is_some() {
            return Err(DomainError::invariant("banned account cannot submit verification"));
        }

        match self.verification {
            VerificationStatus::Unsubmitted | VerificationStatus::Rejected => {}
            VerificationStatus::Pending => {
                return Err(DomainError::conflict("verification is already pending"));
            }
            VerificationStatus::Verified => {
                return Err(DomainError::conflict("identity is already verified"));
            }
        }

        Ok(vec![UserEvent::VerificationSubmitted(VerificationSubmitted {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_review_verification(
        &self,
        cmd: &ReviewVerification,
    ) -> Result<Vec<UserEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_user_id(cmd.user_id)?;

        if self.verification != VerificationStatus::Pending {
            return Err(DomainError::conflict("no pending verification to review"));
        }

        Ok(vec![UserEvent::VerificationReviewed(VerificationReviewed {
            user_id: cmd.user_id,
            approved: cmd.approve,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn registered_user(id: UserId, role: Role) -> User {
        let mut user = User::empty(id);
        let events = user
            .handle(&UserCommand::Register(RegisterUser {
                user_id: id,
                email: "user@example.com".to_string(),
                display_name: "Test User".to_string(),
                role,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }
        user
    }

    fn banned_user(id: UserId) -> User {
        let mut user = registered_user(id, Role::Finder);
        let events = user
            .handle(&UserCommand::Ban(BanUser {
                user_id: id,
                reason: "policy violation".to_string(),
                severity: BanSeverity::Temporary,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }
        user
    }

    #[test]
    fn register_emits_registered_event_and_normalizes_email() {
        let id = UserId::new();
        let user = User::empty(id);
        let events = user
            .handle(&UserCommand::Register(RegisterUser {
                user_id: id,
                email: "  Client@Example.COM ".to_string(),
                display_name: " Jane ".to_string(),
                role: Role::Client,
                occurred_at: test_time(),
            }))
            .unwrap();

        match &events[0] {
            UserEvent::Registered(e) => {
                assert_eq!(e.email, "client@example.com");
                assert_eq!(e.display_name, "Jane");
                assert_eq!(e.role, Role::Client);
            }
            other => panic!("expected Registered, got {other:?}"),
        }
    }

    #[test]
    fn register_rejects_invalid_email() {
        let id = UserId::new();
        let user = User::empty(id);
        let err = user
            .handle(&UserCommand::Register(RegisterUser {
                user_id: id,
                email: "not-an-email".to_string(),
                display_name: "Jane".to_string(),
                role: Role::Client,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_rejects_duplicate_registration() {
        let id = UserId::new();
        let user = registered_user(id, Role::Client);
        let err = user
            .handle(&UserCommand::Register(RegisterUser {
                user_id: id,
                email: "again@example.com".to_string(),
                display_name: "Jane".to_string(),
                role: Role::Client,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn ban_sets_reason_severity_and_timestamp_together() {
        let id = UserId::new();
        let user = banned_user(id);

        let ban = user.ban().expect("user must be banned");
        assert_eq!(ban.reason, "policy violation");
        assert_eq!(ban.severity, BanSeverity::Temporary);
        assert!(user.is_banned());
    }

    #[test]
    fn ban_rejects_empty_reason() {
        let id = UserId::new();
        let user = registered_user(id, Role::Finder);
        let err = user
            .handle(&UserCommand::Ban(BanUser {
                user_id: id,
                reason: "   ".to_string(),
                severity: BanSeverity::Warning,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn double_ban_is_a_conflict() {
        let id = UserId::new();
        let user = banned_user(id);
        let err = user
            .handle(&UserCommand::Ban(BanUser {
                user_id: id,
                reason: "again".to_string(),
                severity: BanSeverity::Permanent,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn unban_clears_all_ban_fields_together() {
        let id = UserId::new();
        let mut user = banned_user(id);
        let events = user
            .handle(&UserCommand::Unban(UnbanUser {
                user_id: id,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }

        assert!(!user.is_banned());
        assert!(user.ban().is_none());
    }

    #[test]
    fn unban_without_ban_is_a_conflict() {
        let id = UserId::new();
        let user = registered_user(id, Role::Client);
        let err = user
            .handle(&UserCommand::Unban(UnbanUser {
                user_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn verification_moves_forward_only() {
        let id = UserId::new();
        let mut user = registered_user(id, Role::Finder);

        let submit = UserCommand::SubmitVerification(SubmitVerification {
            user_id: id,
            occurred_at: test_time(),
        });
        let events = user.handle(&submit).unwrap();
        for e in &events {
            user.apply(e);
        }
        assert_eq!(user.verification(), VerificationStatus::Pending);

        // Resubmitting while pending is a conflict.
        assert!(matches!(
            user.handle(&submit).unwrap_err(),
            DomainError::Conflict(_)
        ));

        let events = user
            .handle(&UserCommand::ReviewVerification(ReviewVerification {
                user_id: id,
                approve: true,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &events {
            user.apply(e);
        }
        assert_eq!(user.verification(), VerificationStatus::Verified);

        // Verified is terminal for submission.
        assert!(matches!(
            user.handle(&submit).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn rejected_verification_may_be_resubmitted() {
        let id = UserId::new();
        let mut user = registered_user(id, Role::Finder);

        let submit = UserCommand::SubmitVerification(SubmitVerification {
            user_id: id,
            occurred_at: test_time(),
        });
        for e in &user.handle(&submit).unwrap() {
            user.apply(e);
        }
        let reviewed = user
            .handle(&UserCommand::ReviewVerification(ReviewVerification {
                user_id: id,
                approve: false,
                occurred_at: test_time(),
            }))
            .unwrap();
        for e in &reviewed {
            user.apply(e);
        }
        assert_eq!(user.verification(), VerificationStatus::Rejected);

        let events = user.handle(&submit).unwrap();
        assert!(matches!(events[0], UserEvent::VerificationSubmitted(_)));
    }

    #[test]
    fn banned_account_cannot_submit_verification() {
        let id = UserId::new();
        let user = banned_user(id);
        let err = user
            .handle(&UserCommand::SubmitVerification(SubmitVerification {
                user_id: id,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn verification_steps_are_monotonic() {
        assert_eq!(
            verification_steps(VerificationStatus::Unsubmitted),
            [true, false, false, false]
        );
        assert_eq!(
            verification_steps(VerificationStatus::Pending),
            [true, true, false, false]
        );
        assert_eq!(
            verification_steps(VerificationStatus::Rejected),
            [true, true, true, false]
        );
        assert_eq!(
            verification_steps(VerificationStatus::Verified),
            [true, true, true, true]
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: handle is deterministic (same state + command = same events).
            #[test]
            fn handle_is_deterministic(
                email_local in "[a-z]{1,16}",
                name in "[A-Za-z][A-Za-z ]{0,40}"
            ) {
                let id = UserId::new();
                let user = User::empty(id);
                let cmd = UserCommand::Register(RegisterUser {
                    user_id: id,
                    email: format!("{email_local}@example.com"),
                    display_name: name,
                    role: Role::Finder,
                    occurred_at: Utc::now(),
                });

                let a = user.handle(&cmd);
                let b = user.handle(&cmd);
                prop_assert_eq!(a, b);
            }

            /// Property: ban then unban always returns to a state where
            /// ban fields are absent.
            #[test]
            fn ban_unban_round_trip_clears_state(reason in "[a-z ]{1,40}") {
                let id = UserId::new();
                let mut user = registered_user(id, Role::Client);
                prop_assume!(!reason.trim().is_empty());

                for e in &user.handle(&UserCommand::Ban(BanUser {
                    user_id: id,
                    reason,
                    severity: BanSeverity::Warning,
                    occurred_at: Utc::now(),
                })).unwrap() {
                    user.apply(e);
                }
                prop_assert!(user.is_banned());

                for e in &user.handle(&UserCommand::Unban(UnbanUser {
                    user_id: id,
                    occurred_at: Utc::now(),
                })).unwrap() {
                    user.apply(e);
                }
                prop_assert!(user.ban().is_none());
            }
        }
    }
}
