//! Request-level authorization for commands.
//!
//! Ordering is load-bearing: the ban check always runs before the role check,
//! so a banned user receives the ban payload even when their role would also
//! have failed. Handlers call these guards before dispatching anything.

use axum::response::Response;

use findermeister_auth::{Role, Session};

use crate::app::errors;

/// Reject banned accounts with the ban-specific `403` payload.
pub fn ensure_not_banned(session: &Session) -> Result<(), Response> {
    match &session.ban {
        Some(ban) => Err(errors::ban_response(ban)),
        None => Ok(()),
    }
}

/// Ban check first, then exact-role check.
pub fn require_role(session: &Session, required: Role) -> Result<(), Response> {
    ensure_not_banned(session)?;

    if session.role != required {
        return Err(errors::forbidden(format!(
            "this action requires the {required} role"
        )));
    }

    Ok(())
}
