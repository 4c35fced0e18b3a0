use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};

use findermeister_auth::{Hs256JwtValidator, JwtClaims, RegisterUser, Role, User, UserCommand};
use findermeister_core::{AggregateId, UserId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;

/// Session token lifetime.
const TOKEN_TTL_HOURS: i64 = 24;

/// Public registration endpoint. Issues a signed session token on success.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(validator): Extension<Arc<Hs256JwtValidator>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let role: Role = match body.role.parse() {
        Ok(r) => r,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_role",
                format!("unknown role '{}'", body.role),
            );
        }
    };

    // Best-effort duplicate guard against the read model.
    if services.users.get_by_email(&body.email).is_some() {
        return errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "an account with this email already exists",
        );
    }

    let user_id = UserId::new();
    let now = Utc::now();

    let cmd = UserCommand::Register(RegisterUser {
        user_id,
        email: body.email,
        display_name: body.display_name,
        role,
        occurred_at: now,
    });

    if let Err(e) = services.dispatch::<User>(
        AggregateId::from(user_id),
        "auth.user",
        cmd,
        |aggregate_id| User::empty(UserId::from(aggregate_id)),
    ) {
        return errors::dispatch_error_to_response(e);
    }

    let claims = JwtClaims {
        sub: user_id,
        role,
        issued_at: now,
        expires_at: now + Duration::hours(TOKEN_TTL_HOURS),
    };
    let token = match validator.issue(&claims) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "token_error",
                "failed to issue session token",
            );
        }
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "user_id": user_id.to_string(),
            "token": token,
        })),
    )
        .into_response()
}
