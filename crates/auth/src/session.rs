//! Session resolution: bearer credential → resolved identity.
//!
//! The resolved [`Session`] is an explicit value object threaded through the
//! request context by the API layer; there is no ambient "current user"
//! singleton anywhere in the workspace.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use findermeister_core::UserId;

use crate::ban::BanState;
use crate::jwt::{JwtError, JwtValidator};
use crate::roles::Role;
use crate::user::VerificationStatus;

/// Resolved identity for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    /// Present iff the account is banned.
    pub ban: Option<BanState>,
    pub verification: VerificationStatus,
}

impl Session {
    pub fn is_banned(&self) -> bool {
        self.ban.is_some()
    }
}

/// Resolution state as seen by the authorization gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No credential is present, or the credential failed to resolve.
    Unauthenticated,
    /// A credential exists but resolution has not finished; the gate must
    /// take no redirect action on this state.
    Resolving,
    Resolved(Session),
}

/// Live account lookup used during resolution.
///
/// Implemented by the API layer over the users read model. Ban and
/// verification state are read through this seam on every resolution and are
/// never cached, so an admin ban takes effect on the very next request.
pub trait UserLookup: Send + Sync {
    fn find_user(&self, id: UserId) -> Option<Session>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Missing, malformed, expired or wrongly-signed credential.
    #[error("invalid credential")]
    InvalidCredential(#[source] JwtError),

    /// The credential verified but no such account exists (e.g. deleted).
    #[error("unknown account")]
    UnknownAccount,
}

#[derive(Debug, Clone)]
struct VerifiedCredential {
    sub: UserId,
    expires_at: DateTime<Utc>,
}

/// Resolves bearer credentials into sessions.
///
/// Signature verification for a given credential string runs at most once
/// while it remains valid: the verified subject is cached per token under a
/// single map lock, so concurrent consumers of one credential observe one
/// in-flight verification rather than duplicating work. Any failure evicts
/// the cached entry, preventing a failed credential from being retried from
/// cache on a loop.
pub struct SessionResolver<V, L> {
    validator: V,
    lookup: L,
    verified: Mutex<HashMap<String, VerifiedCredential>>,
}

impl<V, L> SessionResolver<V, L>
where
    V: JwtValidator,
    L: UserLookup,
{
    pub fn new(validator: V, lookup: L) -> Self {
        Self {
            validator,
            lookup,
            verified: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<Session, ResolveError> {
        let sub = self.verify_subject(token, now)?;

        match self.lookup.find_user(sub) {
            Some(session) => Ok(session),
            None => {
                self.evict(token);
                Err(ResolveError::UnknownAccount)
            }
        }
    }

    fn verify_subject(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, ResolveError> {
        // Verification happens under the map lock: single-flight per credential.
        let mut verified = match self.verified.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(entry) = verified.get(token) {
            if now < entry.expires_at {
                return Ok(entry.sub);
            }
            verified.remove(token);
        }

        match self.validator.validate(token, now) {
            Ok(claims) => {
                verified.insert(
                    token.to_string(),
                    VerifiedCredential {
                        sub: claims.sub,
                        expires_at: claims.expires_at,
                    },
                );
                Ok(claims.sub)
            }
            Err(e) => {
                verified.remove(token);
                Err(ResolveError::InvalidCredential(e))
            }
        }
    }

    fn evict(&self, token: &str) {
        if let Ok(mut verified) = self.verified.lock() {
            verified.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;

    use crate::claims::JwtClaims;

    struct CountingValidator {
        calls: AtomicUsize,
        claims: JwtClaims,
    }

    impl JwtValidator for CountingValidator {
        fn validate(&self, _token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            crate::claims::validate_claims(&self.claims, now)?;
            Ok(self.claims.clone())
        }
    }

    struct MapLookup {
        users: RwLock<HashMap<UserId, Session>>,
    }

    impl UserLookup for MapLookup {
        fn find_user(&self, id: UserId) -> Option<Session> {
            self.users.read().ok()?.get(&id).cloned()
        }
    }

    fn setup(now: DateTime<Utc>) -> (UserId, SessionResolver<CountingValidator, MapLookup>) {
        let user_id = UserId::new();
        let validator = CountingValidator {
            calls: AtomicUsize::new(0),
            claims: JwtClaims {
                sub: user_id,
                role: Role::Client,
                issued_at: now,
                expires_at: now + Duration::minutes(10),
            },
        };
        let mut users = HashMap::new();
        users.insert(
            user_id,
            Session {
                user_id,
                email: "client@example.com".to_string(),
                role: Role::Client,
                ban: None,
                verification: VerificationStatus::Unsubmitted,
            },
        );
        let lookup = MapLookup {
            users: RwLock::new(users),
        };
        (user_id, SessionResolver::new(validator, lookup))
    }

    #[test]
    fn repeated_resolution_verifies_signature_once() {
        let now = Utc::now();
        let (user_id, resolver) = setup(now);

        for _ in 0..5 {
            let session = resolver.resolve("token-a", now).unwrap();
            assert_eq!(session.user_id, user_id);
        }
        assert_eq!(resolver.validator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ban_state_is_read_fresh_on_every_resolution() {
        let now = Utc::now();
        let (user_id, resolver) = setup(now);

        assert!(!resolver.resolve("token-a", now).unwrap().is_banned());

        // Admin ban lands in the read model between two requests.
        {
            let mut users = resolver.lookup.users.write().unwrap();
            let entry = users.get_mut(&user_id).unwrap();
            entry.ban = Some(BanState {
                reason: "abuse".to_string(),
                severity: crate::BanSeverity::Permanent,
                banned_at: now,
            });
        }

        assert!(resolver.resolve("token-a", now).unwrap().is_banned());
    }

    #[test]
    fn unknown_account_evicts_cached_credential() {
        let now = Utc::now();
        let (user_id, resolver) = setup(now);

        resolver.resolve("token-a", now).unwrap();
        resolver.lookup.users.write().unwrap().remove(&user_id);

        assert!(matches!(
            resolver.resolve("token-a", now),
            Err(ResolveError::UnknownAccount)
        ));
        assert!(resolver.verified.lock().unwrap().is_empty());
    }

    #[test]
    fn expired_cache_entry_forces_reverification() {
        let now = Utc::now();
        let (_, resolver) = setup(now);

        resolver.resolve("token-a", now).unwrap();
        // Past expiry, the cached subject must not be served.
        let later = now + Duration::minutes(11);
        assert!(matches!(
            resolver.resolve("token-a", later),
            Err(ResolveError::InvalidCredential(_))
        ));
        assert_eq!(resolver.validator.calls.load(Ordering::SeqCst), 2);
    }
}
