use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use findermeister_auth::{
    BanUser, ReviewVerification, Role, Session, UnbanUser, User, UserCommand,
};
use findermeister_core::{AggregateId, UserId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/ban", post(ban_user))
        .route("/users/:id/unban", post(unban_user))
        .route("/users/:id/verification/review", post(review_verification))
        .route("/agents/:id", post(grant_agent).delete(revoke_agent))
        .route("/tickets", get(list_tickets))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let items = services
        .users
        .list()
        .into_iter()
        .map(dto::user_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn ban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::BanUserRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let agg = match common::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = UserCommand::Ban(BanUser {
        user_id: UserId::from(agg),
        reason: body.reason,
        severity: body.severity,
        occurred_at: Utc::now(),
    });
    dispatch_user(&services, agg, cmd)
}

pub async fn unban_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let agg = match common::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = UserCommand::Unban(UnbanUser {
        user_id: UserId::from(agg),
        occurred_at: Utc::now(),
    });
    dispatch_user(&services, agg, cmd)
}

pub async fn review_verification(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::ReviewVerificationRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let agg = match common::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = UserCommand::ReviewVerification(ReviewVerification {
        user_id: UserId::from(agg),
        approve: body.approve,
        occurred_at: Utc::now(),
    });
    dispatch_user(&services, agg, cmd)
}

pub async fn grant_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let agg = match common::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    services.capabilities.grant_agent(UserId::from(agg));
    StatusCode::NO_CONTENT.into_response()
}

pub async fn revoke_agent(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let agg = match common::parse_id(&id, "user") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    services.capabilities.revoke_agent(UserId::from(agg));
    StatusCode::NO_CONTENT.into_response()
}

pub async fn list_tickets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Admin) {
        return resp;
    }

    let items = services.tickets.list();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

fn dispatch_user(
    services: &Arc<AppServices>,
    agg: AggregateId,
    cmd: UserCommand,
) -> axum::response::Response {
    match services.dispatch::<User>(agg, "auth.user", cmd, |aggregate_id| {
        User::empty(UserId::from(aggregate_id))
    }) {
        Ok(c) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": c.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
