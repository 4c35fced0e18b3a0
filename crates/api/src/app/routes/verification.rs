use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use findermeister_auth::{
    Session, SubmitVerification, User, UserCommand, verification_steps,
};
use findermeister_core::{AggregateId, UserId};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", get(status))
        .route("/submit", post(submit))
}

/// Current verification status plus step-completion flags for the progress
/// display.
pub async fn status(Extension(session): Extension<Session>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": session.verification,
            "steps": verification_steps(session.verification),
        })),
    )
        .into_response()
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let cmd = UserCommand::SubmitVerification(SubmitVerification {
        user_id: session.user_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<User>(
        AggregateId::from(session.user_id),
        "auth.user",
        cmd,
        |aggregate_id| User::empty(UserId::from(aggregate_id)),
    ) {
        Ok(c) => (
            StatusCode::OK,
            Json(serde_json::json!({ "events_committed": c.len() })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
