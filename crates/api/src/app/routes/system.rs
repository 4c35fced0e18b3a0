use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use findermeister_auth::Session;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": session.user_id.to_string(),
        "email": session.email,
        "role": session.role,
    }))
}
