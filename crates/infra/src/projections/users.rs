//! User directory projection.
//!
//! Feeds the session resolver (ban and verification state are read from here
//! on every resolution) and the admin user listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use findermeister_auth::{BanState, Role, Session, UserEvent, VerificationStatus};
use findermeister_core::UserId;
use findermeister_events::EventEnvelope;

use crate::read_model::ReadStore;

/// User read model for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReadModel {
    pub user_id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub ban: Option<BanState>,
    pub verification: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReadModel {
    pub fn to_session(&self) -> Session {
        Session {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
            ban: self.ban.clone(),
            verification: self.verification,
        }
    }
}

/// Projection maintaining the user directory.
pub struct UsersProjection<S> {
    store: S,
}

impl<S> UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != "auth.user" {
            return Ok(());
        }

        let event: UserEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            UserEvent::Registered(e) => {
                let model = UserReadModel {
                    user_id: e.user_id,
                    email: e.email,
                    display_name: e.display_name,
                    role: e.role,
                    ban: None,
                    verification: VerificationStatus::Unsubmitted,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                };
                self.store.upsert(e.user_id, model);
            }
            UserEvent::Banned(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.ban = Some(BanState {
                        reason: e.reason,
                        severity: e.severity,
                        banned_at: e.occurred_at,
                    });
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::Unbanned(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.ban = None;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::VerificationSubmitted(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.verification = VerificationStatus::Pending;
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
            UserEvent::VerificationReviewed(e) => {
                if let Some(mut model) = self.store.get(&e.user_id) {
                    model.verification = if e.approved {
                        VerificationStatus::Verified
                    } else {
                        VerificationStatus::Rejected
                    };
                    model.updated_at = e.occurred_at;
                    self.store.upsert(e.user_id, model);
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserReadModel> {
        self.store.get(user_id)
    }

    pub fn list(&self) -> Vec<UserReadModel> {
        self.store.list()
    }

    /// Look up a user by email (linear scan).
    pub fn get_by_email(&self, email: &str) -> Option<UserReadModel> {
        let normalized = email.trim().to_lowercase();
        self.list().into_iter().find(|u| u.email == normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use chrono::Utc;
    use findermeister_auth::{BanSeverity, UserBanned, UserRegistered, UserUnbanned};
    use findermeister_core::AggregateId;
    use std::sync::Arc;
    use uuid::Uuid;

    fn envelope(user_id: UserId, event: &UserEvent) -> EventEnvelope<serde_json::Value> {
        EventEnvelope::new(
            Uuid::now_v7(),
            AggregateId::from(user_id),
            "auth.user",
            1,
            serde_json::to_value(event).unwrap(),
        )
    }

    fn registered(projection: &UsersProjection<Arc<InMemoryReadStore<UserId, UserReadModel>>>) -> UserId {
        let user_id = UserId::new();
        let event = UserEvent::Registered(UserRegistered {
            user_id,
            email: "finder@example.com".to_string(),
            display_name: "Ada".to_string(),
            role: Role::Finder,
            occurred_at: Utc::now(),
        });
        projection.apply_envelope(&envelope(user_id, &event)).unwrap();
        user_id
    }

    #[test]
    fn ban_and_unban_round_trip() {
        let projection = UsersProjection::new(Arc::new(InMemoryReadStore::new()));
        let user_id = registered(&projection);

        let banned_at = Utc::now();
        projection
            .apply_envelope(&envelope(
                user_id,
                &UserEvent::Banned(UserBanned {
                    user_id,
                    reason: "fraudulent listings".to_string(),
                    severity: BanSeverity::Permanent,
                    occurred_at: banned_at,
                }),
            ))
            .unwrap();

        let model = projection.get(&user_id).unwrap();
        let ban = model.ban.as_ref().unwrap();
        assert_eq!(ban.reason, "fraudulent listings");
        assert_eq!(ban.banned_at, banned_at);

        projection
            .apply_envelope(&envelope(
                user_id,
                &UserEvent::Unbanned(UserUnbanned {
                    user_id,
                    occurred_at: Utc::now(),
                }),
            ))
            .unwrap();
        assert!(projection.get(&user_id).unwrap().ban.is_none());
    }

    #[test]
    fn lookup_by_email_is_normalized() {
        let projection = UsersProjection::new(Arc::new(InMemoryReadStore::new()));
        registered(&projection);

        assert!(projection.get_by_email("  FINDER@example.com ").is_some());
        assert!(projection.get_by_email("nobody@example.com").is_none());
    }

    #[test]
    fn foreign_aggregate_types_are_ignored() {
        let projection = UsersProjection::new(Arc::new(InMemoryReadStore::new()));
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            AggregateId::new(),
            "finds.find",
            1,
            serde_json::json!({"unrelated": true}),
        );
        projection.apply_envelope(&envelope).unwrap();
        assert!(projection.list().is_empty());
    }
}
