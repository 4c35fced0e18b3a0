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
use findermeister_core::{AggregateId, UserId};
use findermeister_finds::FindId;
use findermeister_messaging::{PostMessage, StartThread, Thread, ThreadCommand, ThreadId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(start_thread).get(list_threads))
        .route("/:id", get(get_thread))
        .route("/:id/messages", post(post_message))
}

/// Start a conversation thread on a find. A client opens it toward a finder;
/// a finder opens it toward the posting client.
pub async fn start_thread(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::StartThreadRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let find_agg = match common::parse_id(&body.find_id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let find_id = FindId::new(find_agg);

    let find = match services.finds.get(&find_id) {
        Some(f) => f,
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    };

    let (client_id, finder_id) = match session.role {
        Role::Client => {
            if find.client_id != session.user_id {
                return errors::forbidden("only the posting client may start this thread");
            }
            let raw = match body.finder_id.as_deref() {
                Some(raw) => raw,
                None => {
                    return errors::json_error(
                        StatusCode::BAD_REQUEST,
                        "validation_error",
                        "finder_id is required",
                    );
                }
            };
            let finder_agg = match common::parse_id(raw, "finder") {
                Ok(v) => v,
                Err(resp) => return resp,
            };
            (session.user_id, UserId::from(finder_agg))
        }
        Role::Finder => (find.client_id, session.user_id),
        Role::Admin => return errors::forbidden("admins are not thread participants"),
    };

    let agg = AggregateId::new();
    let cmd = ThreadCommand::Start(StartThread {
        thread_id: ThreadId::new(agg),
        find_id,
        client_id,
        finder_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Thread>(agg, "messaging.thread", cmd, |aggregate_id| {
        Thread::empty(ThreadId::new(aggregate_id))
    }) {
        Ok(c) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": c.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn list_threads(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let items = services.threads.list_for_user(session.user_id);
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_thread(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "thread") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.threads.get(&ThreadId::new(agg)) {
        Some(rm) if rm.is_participant(session.user_id) || session.role == Role::Admin => {
            (StatusCode::OK, Json(rm)).into_response()
        }
        Some(_) => errors::forbidden("not a participant in this thread"),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "thread not found"),
    }
}

pub async fn post_message(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::PostMessageRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "thread") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ThreadCommand::Post(PostMessage {
        thread_id: ThreadId::new(agg),
        sender_id: session.user_id,
        body: body.body,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Thread>(agg, "messaging.thread", cmd, |aggregate_id| {
        Thread::empty(ThreadId::new(aggregate_id))
    }) {
        Ok(c) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "events_committed": c.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
