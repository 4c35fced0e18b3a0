use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use findermeister_auth::BanState;
use findermeister_infra::command_dispatcher::DispatchError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DispatchError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DispatchError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "unauthorized", "unauthorized")
        }
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
        DispatchError::Publish(msg) => json_error(StatusCode::BAD_GATEWAY, "publish_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Role-mismatch (or similar) rejection for an account in good standing.
pub fn forbidden(message: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({ "message": message.into() })),
    )
        .into_response()
}

/// Ban-specific `403` payload. Shape is fixed: clients branch on `isBanned`
/// to show the interstitial instead of a generic error.
pub fn ban_response(ban: &BanState) -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        axum::Json(json!({
            "message": "Your account has been banned",
            "isBanned": true,
            "bannedReason": ban.reason,
            "bannedAt": ban.banned_at,
        })),
    )
        .into_response()
}
