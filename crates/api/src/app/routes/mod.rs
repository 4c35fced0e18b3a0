use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod common;
pub mod contracts;
pub mod finds;
pub mod messages;
pub mod proposals;
pub mod session;
pub mod support;
pub mod system;
pub mod tokens;
pub mod verification;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/session", session::router())
        .nest("/finds", finds::router())
        .nest("/proposals", proposals::router())
        .nest("/tokens", tokens::router())
        .nest("/contracts", contracts::router())
        .nest("/verification", verification::router())
        .nest("/threads", messages::router())
        .nest("/support", support::router())
        .nest("/admin", admin::router())
}
