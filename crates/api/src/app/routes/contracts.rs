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
use findermeister_contracts::{
    CompleteWork, Contract, ContractCommand, ContractId, OpenContract, ReleaseEscrow, StartWork,
    SubmitWork,
};
use findermeister_core::AggregateId;
use findermeister_proposals::{ProposalId, ProposalStatus};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/", post(open_contract).get(list_contracts))
        .route("/:id", get(get_contract))
        .route("/:id/start", post(start_work))
        .route("/:id/submit", post(submit_work))
        .route("/:id/complete", post(complete_work))
        .route("/:id/release", post(release_escrow))
        .route("/:id/escrow-steps", get(escrow_steps))
}

/// Open a contract from an accepted proposal. The contract amount is the
/// accepted proposal's price; escrow starts `held`.
pub async fn open_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::OpenContractRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let proposal_agg = match common::parse_id(&body.proposal_id, "proposal") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let proposal = match services.proposals.get(&ProposalId::new(proposal_agg)) {
        Some(p) => p,
        None => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "proposal not found");
        }
    };
    if proposal.status != ProposalStatus::Accepted {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "only an accepted proposal can be hired",
        );
    }
    match services.finds.get(&proposal.find_id) {
        Some(find) if find.client_id == session.user_id => {}
        Some(_) => return errors::forbidden("only the posting client may open this contract"),
        None => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "find not found"),
    }

    let agg = AggregateId::new();
    let cmd = ContractCommand::Open(OpenContract {
        contract_id: ContractId::new(agg),
        find_id: proposal.find_id,
        client_id: session.user_id,
        finder_id: proposal.finder_id,
        amount: proposal.price,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<Contract>(agg, "contracts.contract", cmd, |aggregate_id| {
        Contract::empty(ContractId::new(aggregate_id))
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

pub async fn list_contracts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::ensure_not_banned(&session) {
        return resp;
    }

    let items = services
        .contracts
        .list_for_user(session.user_id)
        .into_iter()
        .map(dto::contract_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_contract(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match load_for_party(&services, &session, &id) {
        Ok(rm) => (StatusCode::OK, Json(dto::contract_to_json(rm))).into_response(),
        Err(resp) => resp,
    }
}

/// Step-completion flags for the escrow progress display.
pub async fn escrow_steps(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match load_for_party(&services, &session, &id) {
        Ok(rm) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "contract_id": rm.contract_id.to_string(),
                "status": rm.status,
                "steps": rm.escrow_steps(),
            })),
        )
            .into_response(),
        Err(resp) => resp,
    }
}

pub async fn start_work(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let agg = match common::parse_id(&id, "contract") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ContractCommand::StartWork(StartWork {
        contract_id: ContractId::new(agg),
        finder_id: session.user_id,
        occurred_at: Utc::now(),
    });
    dispatch_contract(&services, agg, cmd)
}

pub async fn submit_work(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    Json(body): Json<dto::SubmitWorkRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let agg = match common::parse_id(&id, "contract") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ContractCommand::SubmitWork(SubmitWork {
        contract_id: ContractId::new(agg),
        finder_id: session.user_id,
        note: body.note,
        occurred_at: Utc::now(),
    });
    dispatch_contract(&services, agg, cmd)
}

pub async fn complete_work(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = match common::parse_id(&id, "contract") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ContractCommand::CompleteWork(CompleteWork {
        contract_id: ContractId::new(agg),
        client_id: session.user_id,
        occurred_at: Utc::now(),
    });
    dispatch_contract(&services, agg, cmd)
}

pub async fn release_escrow(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Client) {
        return resp;
    }

    let agg = match common::parse_id(&id, "contract") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let cmd = ContractCommand::ReleaseEscrow(ReleaseEscrow {
        contract_id: ContractId::new(agg),
        client_id: session.user_id,
        occurred_at: Utc::now(),
    });
    dispatch_contract(&services, agg, cmd)
}

fn load_for_party(
    services: &Arc<AppServices>,
    session: &Session,
    id: &str,
) -> Result<findermeister_infra::projections::ContractReadModel, axum::response::Response> {
    authz::ensure_not_banned(session)?;

    let agg = common::parse_id(id, "contract")?;
    let rm = services
        .contracts
        .get(&ContractId::new(agg))
        .ok_or_else(|| {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "contract not found")
        })?;

    if !rm.is_party(session.user_id) && session.role != Role::Admin {
        return Err(errors::forbidden("not a party to this contract"));
    }

    Ok(rm)
}

fn dispatch_contract(
    services: &Arc<AppServices>,
    agg: AggregateId,
    cmd: ContractCommand,
) -> axum::response::Response {
    match services.dispatch::<Contract>(agg, "contracts.contract", cmd, |aggregate_id| {
        Contract::empty(ContractId::new(aggregate_id))
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
