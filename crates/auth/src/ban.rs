//! Ban state and the user-facing ban notice.
//!
//! A ban is modelled as `Option<BanState>` on the account: reason, severity
//! and timestamp exist exactly when the ban does, so the "fields present iff
//! banned" invariant cannot be violated by construction. Admin actions set
//! and clear the whole state together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Severity attached by the moderating admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanSeverity {
    Warning,
    Temporary,
    Permanent,
}

/// Active ban on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanState {
    pub reason: String,
    pub severity: BanSeverity,
    pub banned_at: DateTime<Utc>,
}

/// Support channels shown on the ban interstitial.
pub const SUPPORT_CHANNELS: [&str; 2] = ["support@findermeister.example", "+1 (800) 555-0130"];

/// Payload backing the client-side ban interstitial.
///
/// Purely presentational data; the authoritative rejection happens in the
/// request-handling layer before any other check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BanNotice {
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<BanSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_at: Option<DateTime<Utc>>,
    /// Long-form date for display (e.g. "March  4, 2026").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banned_at_display: Option<String>,
    pub support_channels: Vec<String>,
}

impl BanNotice {
    pub fn from_session(session: &Session) -> Self {
        match &session.ban {
            Some(ban) => Self {
                blocked: true,
                reason: Some(ban.reason.clone()),
                severity: Some(ban.severity),
                banned_at: Some(ban.banned_at),
                banned_at_display: Some(long_date(ban.banned_at)),
                support_channels: SUPPORT_CHANNELS.iter().map(|s| s.to_string()).collect(),
            },
            None => Self {
                blocked: false,
                reason: None,
                severity: None,
                banned_at: None,
                banned_at_display: None,
                support_channels: Vec::new(),
            },
        }
    }
}

/// Long localized date rendering used by the interstitial.
pub fn long_date(at: DateTime<Utc>) -> String {
    at.format("%B %e, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use findermeister_core::UserId;

    use crate::{Role, VerificationStatus};

    fn session_with(ban: Option<BanState>) -> Session {
        Session {
            user_id: UserId::new(),
            email: "finder@example.com".to_string(),
            role: Role::Finder,
            ban,
            verification: VerificationStatus::Unsubmitted,
        }
    }

    #[test]
    fn notice_carries_all_ban_fields_when_blocked() {
        let banned_at = Utc.with_ymd_and_hms(2026, 3, 4, 12, 0, 0).unwrap();
        let notice = BanNotice::from_session(&session_with(Some(BanState {
            reason: "spam proposals".to_string(),
            severity: BanSeverity::Temporary,
            banned_at,
        })));

        assert!(notice.blocked);
        assert_eq!(notice.reason.as_deref(), Some("spam proposals"));
        assert_eq!(notice.banned_at, Some(banned_at));
        assert_eq!(notice.banned_at_display.as_deref(), Some("March  4, 2026"));
        assert!(!notice.support_channels.is_empty());
    }

    #[test]
    fn notice_is_empty_when_not_blocked() {
        let notice = BanNotice::from_session(&session_with(None));
        assert!(!notice.blocked);
        assert!(notice.reason.is_none());
        assert!(notice.banned_at.is_none());
        assert!(notice.banned_at_display.is_none());
    }

    #[test]
    fn ban_fields_serialize_iff_banned() {
        let blocked = BanNotice::from_session(&session_with(Some(BanState {
            reason: "fraud".to_string(),
            severity: BanSeverity::Permanent,
            banned_at: Utc::now(),
        })));
        let clear = BanNotice::from_session(&session_with(None));

        let blocked_json = serde_json::to_value(&blocked).unwrap();
        let clear_json = serde_json::to_value(&clear).unwrap();

        assert!(blocked_json.get("bannedReason").is_none()); // ban notice uses `reason`
        assert!(blocked_json.get("reason").is_some());
        assert!(blocked_json.get("bannedAt").is_some());
        assert!(clear_json.get("reason").is_none());
        assert!(clear_json.get("bannedAt").is_none());
    }
}
