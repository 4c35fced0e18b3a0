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
use findermeister_finds::{FindId, FindStatus};
use findermeister_proposals::{
    AcceptProposal, PROPOSAL_TOKEN_COST, Proposal, ProposalCommand, ProposalId, RejectProposal,
    SubmitProposal, TokenAccount, TokenCommand, WithdrawProposal, token_account_id,
};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_proposal))
        .route("/mine", get(my_proposals))
        .route("/:id/accept", post(accept_proposal))
        .route("/:id/reject", post(reject_proposal))
        .route("/:id/withdraw", post(withdraw_proposal))
}

/// Submit a proposal with the target find in the body.
pub async fn create_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::CreateProposalRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let find_agg = match common::parse_id(&body.find_id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    submit_for_find(&services, &session, find_agg, body.message, body.price)
}

/// Submit a proposal against a find named in the path.
pub async fn submit_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::SubmitProposalRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let find_agg = match common::parse_id(&id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    submit_for_find(&services, &session, find_agg, body.message, body.price)
}

/// Shared submission path. Costs [`PROPOSAL_TOKEN_COST`] tokens. Inputs are
/// validated before the charge and the charge lands before the proposal, so a
/// rejected submission costs nothing and an accepted one never goes unpaid.
fn submit_for_find(
    services: &Arc<AppServices>,
    session: &Session,
    find_agg: AggregateId,
    message: String,
    price: u64,
) -> axum::response::Response {
    let find_id = FindId::new(find_agg);

    let find = match services.finds.get(&find_id) {
        Some(f) => f,
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    };
    if find.status != FindStatus::Open {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "this find is no longer accepting proposals",
        );
    }

    // The aggregate re-checks these, but the check must run before the token
    // charge: a submission that can never be recorded must not cost a token.
    if message.trim().is_empty() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "proposal message cannot be empty",
        );
    }
    if price == 0 {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "price must be positive",
        );
    }

    let now = Utc::now();
    let finder_id = session.user_id;

    let charge = TokenCommand::Consume(findermeister_proposals::ConsumeTokens {
        finder_id,
        amount: PROPOSAL_TOKEN_COST,
        occurred_at: now,
    });
    if let Err(e) = services.dispatch::<TokenAccount>(
        token_account_id(finder_id),
        "proposals.tokens",
        charge,
        |_aggregate_id| TokenAccount::empty(finder_id),
    ) {
        return errors::dispatch_error_to_response(e);
    }

    let agg = AggregateId::new();
    let proposal_id = ProposalId::new(agg);

    let cmd = ProposalCommand::Submit(SubmitProposal {
        proposal_id,
        find_id,
        finder_id,
        message,
        price,
        occurred_at: now,
    });

    match services.dispatch::<Proposal>(agg, "proposals.proposal", cmd, |aggregate_id| {
        Proposal::empty(ProposalId::new(aggregate_id))
    }) {
        Ok(c) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": agg.to_string(),
                "tokens_charged": PROPOSAL_TOKEN_COST,
                "events_committed": c.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// Proposals on a find. The posting client (or an admin) sees all of them; a
/// finder sees only their own.
pub async fn list_for_find(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let find_agg = match common::parse_id(&id, "find") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let find_id = FindId::new(find_agg);

    let find = match services.finds.get(&find_id) {
        Some(f) => f,
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    };

    let mut items = services.proposals.list_for_find(find_id);
    let owner_or_admin = find.client_id == session.user_id || session.role == Role::Admin;
    if !owner_or_admin {
        items.retain(|p| p.finder_id == session.user_id);
    }

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn my_proposals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let items = services.proposals.list_for_finder(session.user_id);
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn accept_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    decide_proposal(services, session, id, true).await
}

pub async fn reject_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    decide_proposal(services, session, id, false).await
}

async fn decide_proposal(
    services: Arc<AppServices>,
    session: Session,
    id: String,
    accept: bool,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = match common::parse_id(&id, "proposal") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let proposal_id = ProposalId::new(agg);

    // Only the client who posted the find decides its proposals.
    let proposal = match services.proposals.get(&proposal_id) {
        Some(p) => p,
        None => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "proposal not found");
        }
    };
    match services.finds.get(&proposal.find_id) {
        Some(find) if find.client_id == session.user_id => {}
        Some(_) => return errors::forbidden("only the posting client may decide this proposal"),
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    }

    let now = Utc::now();
    let cmd = if accept {
        ProposalCommand::Accept(AcceptProposal {
            proposal_id,
            occurred_at: now,
        })
    } else {
        ProposalCommand::Reject(RejectProposal {
            proposal_id,
            occurred_at: now,
        })
    };

    match services.dispatch::<Proposal>(agg, "proposals.proposal", cmd, |aggregate_id| {
        Proposal::empty(ProposalId::new(aggregate_id))
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

pub async fn withdraw_proposal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let agg = match common::parse_id(&id, "proposal") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ProposalCommand::Withdraw(WithdrawProposal {
        proposal_id: ProposalId::new(agg),
        finder_id: session.user_id,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Proposal>(agg, "proposals.proposal", cmd, |aggregate_id| {
        Proposal::empty(ProposalId::new(aggregate_id))
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
