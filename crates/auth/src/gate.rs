//! Role authorization gate: admit/redirect decisions per navigation attempt.
//!
//! Decisions are pure values; the caller (route guard, HTTP handler) applies
//! them. [`RedirectGuard`] and [`AgentGate`] are primitives for the consumer
//! of those decisions, holding per-mount state in small atomics. The server
//! only serves the decisions and the capability probe; it does not mount
//! these guards itself.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::{Serialize, Serializer};

use crate::roles::Role;
use crate::session::{Session, SessionState};

/// Navigation targets the gate can redirect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    AdminDashboard,
    FinderDashboard,
    ClientDashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/",
            Route::AdminDashboard => "/admin/dashboard",
            Route::FinderDashboard => "/finder/dashboard",
            Route::ClientDashboard => "/client/dashboard",
        }
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.path())
    }
}

/// Dashboard for the user's **actual** role. A mismatch never redirects to
/// the requested role's area.
pub fn dashboard_for(role: Role) -> Route {
    match role {
        Role::Admin => Route::AdminDashboard,
        Role::Finder => Route::FinderDashboard,
        Role::Client => Route::ClientDashboard,
    }
}

/// Role requirement for a guarded route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any resolved session is admitted.
    Any,
    Exact(Role),
}

/// Derived per navigation/request; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub admit: bool,
    pub redirect_to: Option<Route>,
}

impl AuthorizationDecision {
    pub fn admitted() -> Self {
        Self {
            admit: true,
            redirect_to: None,
        }
    }

    pub fn waiting() -> Self {
        Self {
            admit: false,
            redirect_to: None,
        }
    }

    pub fn denied(redirect_to: Route) -> Self {
        Self {
            admit: false,
            redirect_to: Some(redirect_to),
        }
    }
}

/// Payment confirmation paths exempt from role-redirect, matched by
/// substring. A cross-role or pre-auth redirect here would interrupt
/// settlement callbacks.
pub const PAYMENT_EXEMPT_SEGMENTS: [&str; 3] =
    ["payment-success", "thank-you", "payment-callback"];

pub fn is_payment_exempt(path: &str) -> bool {
    PAYMENT_EXEMPT_SEGMENTS.iter().any(|seg| path.contains(seg))
}

/// Decide admission for a navigation attempt.
///
/// - In-flight resolution never redirects (transient absence of data is not a
///   denial).
/// - No credential → login.
/// - Role mismatch → the actual role's dashboard.
/// - Payment confirmation paths never redirect.
pub fn admit(state: &SessionState, required: RoleRequirement, path: &str) -> AuthorizationDecision {
    let session = match state {
        SessionState::Resolving => return AuthorizationDecision::waiting(),
        SessionState::Unauthenticated => {
            return if is_payment_exempt(path) {
                AuthorizationDecision::admitted()
            } else {
                AuthorizationDecision::denied(Route::Login)
            };
        }
        SessionState::Resolved(session) => session,
    };

    if is_payment_exempt(path) {
        return AuthorizationDecision::admitted();
    }

    match required {
        RoleRequirement::Any => AuthorizationDecision::admitted(),
        RoleRequirement::Exact(role) if session.role == role => AuthorizationDecision::admitted(),
        RoleRequirement::Exact(_) => AuthorizationDecision::denied(dashboard_for(session.role)),
    }
}

/// Fire-once guard: a failing condition re-evaluated any number of times
/// during one navigation attempt produces at most one redirect.
#[derive(Debug, Default)]
pub struct RedirectGuard {
    fired: AtomicBool,
}

impl RedirectGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip the redirect from a decision if one has already fired.
    pub fn apply(&self, mut decision: AuthorizationDecision) -> AuthorizationDecision {
        if decision.redirect_to.is_some() && self.fired.swap(true, Ordering::SeqCst) {
            decision.redirect_to = None;
        }
        decision
    }
}

/// Probe lifecycle for the support-agent capability.
///
/// The capability is not a [`Role`] on the account; it is granted server-side
/// and checked by a privileged endpoint probe, once per mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Unprobed,
    Verifying,
    Granted,
    Denied,
}

const PROBE_UNPROBED: u8 = 0;
const PROBE_VERIFYING: u8 = 1;
const PROBE_GRANTED: u8 = 2;
const PROBE_DENIED: u8 = 3;

/// Gate for support-agent routes. Memoizes the capability probe so it cannot
/// re-fire on every re-evaluation.
#[derive(Debug, Default)]
pub struct AgentGate {
    state: AtomicU8,
}

impl AgentGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProbeState {
        match self.state.load(Ordering::SeqCst) {
            PROBE_VERIFYING => ProbeState::Verifying,
            PROBE_GRANTED => ProbeState::Granted,
            PROBE_DENIED => ProbeState::Denied,
            _ => ProbeState::Unprobed,
        }
    }

    /// Claim the probe. Returns true for exactly one caller; everyone else
    /// observes the in-flight or finished state.
    pub fn begin_probe(&self) -> bool {
        self.state
            .compare_exchange(
                PROBE_UNPROBED,
                PROBE_VERIFYING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn complete(&self, granted: bool) {
        let outcome = if granted { PROBE_GRANTED } else { PROBE_DENIED };
        self.state.store(outcome, Ordering::SeqCst);
    }

    /// Decision for the probed session: verifying shows a waiting state,
    /// denial redirects by the user's actual role.
    pub fn decision(&self, session: &Session) -> AuthorizationDecision {
        match self.state() {
            ProbeState::Unprobed | ProbeState::Verifying => AuthorizationDecision::waiting(),
            ProbeState::Granted => AuthorizationDecision::admitted(),
            ProbeState::Denied => AuthorizationDecision::denied(dashboard_for(session.role)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use findermeister_core::UserId;

    use crate::user::VerificationStatus;

    fn resolved(role: Role) -> SessionState {
        SessionState::Resolved(Session {
            user_id: UserId::new(),
            email: format!("{role}@example.com"),
            role,
            ban: None,
            verification: VerificationStatus::Unsubmitted,
        })
    }

    #[test]
    fn matching_role_is_admitted_without_redirect() {
        let d = admit(&resolved(Role::Client), RoleRequirement::Exact(Role::Client), "/client/dashboard");
        assert!(d.admit);
        assert_eq!(d.redirect_to, None);
    }

    #[test]
    fn any_requirement_admits_every_resolved_session() {
        for role in [Role::Client, Role::Finder, Role::Admin] {
            assert!(admit(&resolved(role), RoleRequirement::Any, "/finds").admit);
        }
    }

    #[test]
    fn mismatch_redirects_to_actual_role_dashboard() {
        let d = admit(&resolved(Role::Finder), RoleRequirement::Exact(Role::Admin), "/admin/dashboard");
        assert!(!d.admit);
        assert_eq!(d.redirect_to, Some(Route::FinderDashboard));
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let d = admit(&SessionState::Unauthenticated, RoleRequirement::Any, "/finds");
        assert_eq!(d.redirect_to, Some(Route::Login));
    }

    #[test]
    fn in_flight_resolution_takes_no_action() {
        let d = admit(&SessionState::Resolving, RoleRequirement::Exact(Role::Admin), "/admin/dashboard");
        assert!(!d.admit);
        assert_eq!(d.redirect_to, None);
    }

    #[test]
    fn payment_paths_are_exempt_from_role_redirect() {
        for path in [
            "/payment-success",
            "/checkout/thank-you",
            "/api/payment-callback?ref=abc",
        ] {
            let d = admit(&resolved(Role::Finder), RoleRequirement::Exact(Role::Admin), path);
            assert!(d.admit, "{path} must not redirect");
            assert_eq!(d.redirect_to, None);
        }
    }

    #[test]
    fn redirect_fires_at_most_once_per_navigation() {
        let guard = RedirectGuard::new();
        let denied = AuthorizationDecision::denied(Route::Login);

        let first = guard.apply(denied);
        assert_eq!(first.redirect_to, Some(Route::Login));

        // The failing condition keeps re-evaluating; navigation must not thrash.
        for _ in 0..10 {
            assert_eq!(guard.apply(denied).redirect_to, None);
        }
    }

    #[test]
    fn agent_probe_is_claimed_exactly_once() {
        let gate = AgentGate::new();
        assert!(gate.begin_probe());
        assert!(!gate.begin_probe());
        assert_eq!(gate.state(), ProbeState::Verifying);
    }

    #[test]
    fn agent_denial_redirects_by_actual_role() {
        let gate = AgentGate::new();
        let session = match resolved(Role::Client) {
            SessionState::Resolved(s) => s,
            _ => unreachable!(),
        };

        assert_eq!(gate.decision(&session), AuthorizationDecision::waiting());
        gate.begin_probe();
        gate.complete(false);
        assert_eq!(
            gate.decision(&session),
            AuthorizationDecision::denied(Route::ClientDashboard)
        );
    }

    #[test]
    fn decision_serializes_redirect_as_path() {
        let d = AuthorizationDecision::denied(Route::FinderDashboard);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["redirectTo"], "/finder/dashboard");
        assert_eq!(json["admit"], false);
    }
}
