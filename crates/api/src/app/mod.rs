//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store/bus, projections, dispatcher)
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: String) -> Router {
    let validator = findermeister_auth::Hs256JwtValidator::new(jwt_secret.into_bytes());

    let services = Arc::new(services::build_services());

    let resolver = Arc::new(findermeister_auth::SessionResolver::new(
        validator.clone(),
        services.user_lookup(),
    ));
    let auth_state = middleware::AuthState { resolver };

    // Protected routes: require a resolved session.
    let protected = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services.clone())),
    );

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/register", post(routes::auth::register))
        .layer(Extension(services))
        .layer(Extension(Arc::new(validator)))
        .merge(protected)
}
