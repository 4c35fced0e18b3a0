use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use findermeister_auth::{Role, Session};
use findermeister_proposals::{GrantTokens, TokenAccount, TokenCommand, token_account_id};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/balance", get(balance))
        .route("/purchase", post(purchase))
}

pub async fn balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let balance = services.token_balances.balance(&session.user_id);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "finder_id": session.user_id.to_string(),
            "balance": balance,
        })),
    )
        .into_response()
}

/// Credit the caller's token account. Payment settlement happens outside
/// this service; this endpoint records the grant.
pub async fn purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<Session>,
    Json(body): Json<dto::PurchaseTokensRequest>,
) -> axum::response::Response {
    if let Err(resp) = authz::require_role(&session, Role::Finder) {
        return resp;
    }

    let finder_id = session.user_id;
    let cmd = TokenCommand::Grant(GrantTokens {
        finder_id,
        amount: body.amount,
        occurred_at: Utc::now(),
    });

    match services.dispatch::<TokenAccount>(
        token_account_id(finder_id),
        "proposals.tokens",
        cmd,
        |_aggregate_id| TokenAccount::empty(finder_id),
    ) {
        Ok(c) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "finder_id": finder_id.to_string(),
                "granted": body.amount,
                "events_committed": c.len(),
            })),
        )
            .into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
