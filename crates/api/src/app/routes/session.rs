use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use findermeister_auth::{
    BanNotice, Role, RoleRequirement, Session, SessionState, admit,
};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(current_session))
        .route("/gate", get(gate))
        .route("/ban", get(ban_notice))
        .route("/agent-probe", get(agent_probe))
}

pub async fn current_session(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(session)
}

#[derive(Debug, Deserialize)]
pub struct GateQuery {
    /// `any` or a concrete role name.
    pub required: Option<String>,
    pub path: Option<String>,
}

/// Admission decision for a navigation attempt, computed server-side so every
/// client renders the same redirect.
pub async fn gate(
    Extension(session): Extension<Session>,
    Query(query): Query<GateQuery>,
) -> axum::response::Response {
    let requirement = match query.required.as_deref() {
        None | Some("any") => RoleRequirement::Any,
        Some(raw) => match raw.parse::<Role>() {
            Ok(role) => RoleRequirement::Exact(role),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_role",
                    format!("unknown role '{raw}'"),
                );
            }
        },
    };

    let path = query.path.unwrap_or_else(|| "/".to_string());
    let decision = admit(&SessionState::Resolved(session), requirement, &path);

    Json(decision).into_response()
}

pub async fn ban_notice(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(BanNotice::from_session(&session))
}

/// Support-agent capability probe. `204` grants, `403` denies; the client
/// gate memoizes whichever it sees.
pub async fn agent_probe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = crate::authz::ensure_not_banned(&session) {
        return resp;
    }

    if services.capabilities.is_agent(session.user_id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        errors::forbidden("support agent capability required")
    }
}
