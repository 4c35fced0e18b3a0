use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use findermeister_auth::{Role, Session};
use findermeister_core::AggregateId;
use findermeister_finds::{CloseFind, Find, FindCommand, FindId, PostFind, UpdateFind};

use crate::app::routes::{common, proposals};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(post_find).get(list_finds))
        .route("/:id", get(get_find).patch(update_find))
        .route("/:id/close", post(close_find))
        .route(
            "/:id/proposals",
            post(proposals::submit_proposal).get(proposals::list_for_find),
        )
}

pub async fn post_find(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::PostFindRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = AggregateId::new();
    let find_id = FindId::new(agg);

    let cmd = FindCommand::PostFind(PostFind {
        find_id,
        client_id: session.user_id,
        title: body.title,
        description: body.description,
        budget: body.budget,
        occurred_at: Utc::now(),
    });

    let committed = match services.dispatch::<Find>(agg, "finds.find", cmd, |aggregate_id| {
        Find::empty(FindId::new(aggregate_id))
    }) {
        Ok(c) => c,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": agg.to_string(),
            "events_committed": committed.len(),
        })),
    )
        .into_response()
}

pub async fn list_finds(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let items = services.finds.list();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_find(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg = match common::parse_id(&id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.finds.get(&FindId::new(agg)) {
        Some(rm) => (StatusCode::OK, Json(rm)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    }
}

pub async fn update_find(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateFindRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = match common::parse_id(&id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = FindCommand::UpdateFind(UpdateFind {
        find_id: FindId::new(agg),
        client_id: session.user_id,
        title: body.title,
        description: body.description,
        budget: body.budget,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Find>(agg, "finds.find", cmd, |aggregate_id| {
        Find::empty(FindId::new(aggregate_id))
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

pub async fn close_find(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = match common::parse_id(&id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = FindCommand::CloseFind(CloseFind {
        find_id: FindId::new(agg),
        client_id: session.user_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Find>(agg, "finds.find", cmd, |aggregate_id| {
        Find::empty(FindId::new(aggregate_id))
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
