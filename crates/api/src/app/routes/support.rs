use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use findermeister_auth::Session;
use findermeister_core::AggregateId;
use findermeister_support::{
    EscalateTicket, OpenTicket, ReplyToTicket, ResolveTicket, SupportTicket, TicketCommand,
    TicketId,
};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/tickets", post(open_ticket).get(list_tickets))
        .route("/tickets/:id", get(get_ticket))
        .route("/tickets/:id/replies", post(reply))
        .route("/tickets/:id/escalate", post(escalate))
        .route("/tickets/:id/resolve", post(resolve))
}

/// Capability check for agent-only ticket actions. Not a role: granted
/// server-side per account.
fn require_agent(services: &AppServices, session: &Session) -> Result<(), axum::response::Response> {
    authz::ensure_not_banned(session)?;

    if !services.capabilities.is_agent(session.user_id) {
        return Err(errors::forbidden("support agent capability required"));
    }
    Ok(())
}

pub async fn open_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::OpenTicketRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let agg = AggregateId::new();
    let cmd = TicketCommand::Open(OpenTicket {
        ticket_id: TicketId::new(agg),
        opened_by: session.user_id,
        subject: body.subject,
        severity: body.severity,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<SupportTicket>(agg, "support.ticket", cmd, |aggregate_id| {
        SupportTicket::empty(TicketId::new(aggregate_id))
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

/// A user lists their own tickets; agents see the whole queue.
pub async fn list_tickets(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let items = if services.capabilities.is_agent(session.user_id) {
        services.tickets.list()
    } else {
        services.tickets.list_for_user(session.user_id)
    };
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let rm = match services.tickets.get(&TicketId::new(agg)) {
        Some(rm) => rm,
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "ticket not found"),
    };

    if rm.opened_by != session.user_id && !services.capabilities.is_agent(session.user_id) {
        return errors::forbidden("not your ticket");
    }

    (StatusCode::OK, Json(rm)).into_response()
}

/// Opener or agent may reply.
pub async fn reply(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::TicketReplyRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Authorship is enforced by the aggregate against the event stream, not
    // the projection. The capability travels with the command.
    let cmd = TicketCommand::Reply(ReplyToTicket {
        ticket_id: TicketId::new(agg),
        replied_by: session.user_id,
        as_agent: services.capabilities.is_agent(session.user_id),
        body: body.body,
        occurred_at: Utc::now(),
    });
    dispatch_ticket(&services, agg, cmd)
}

pub async fn escalate(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_agent(&services, &session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = TicketCommand::Escalate(EscalateTicket {
        ticket_id: TicketId::new(agg),
        occurred_at: Utc::now(),
    });
    dispatch_ticket(&services, agg, cmd)
}

pub async fn resolve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = require_agent(&services, &session) {
        return resp;
    }

    let agg = match common::parse_id(&id, "ticket") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = TicketCommand::Resolve(ResolveTicket {
        ticket_id: TicketId::new(agg),
        occurred_at: Utc::now(),
    });
    dispatch_ticket(&services, agg, cmd)
}

fn dispatch_ticket(
    services: &Arc<AppServices>,
    agg: AggregateId,
    cmd: TicketCommand,
) -> axum::response::Response {
    match services.dispatch::<SupportTicket>(agg, "support.ticket", cmd, |aggregate_id| {
        SupportTicket::empty(TicketId::new(aggregate_id))
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
