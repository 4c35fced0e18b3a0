use axum::http::StatusCode;
use axum::response::Response;

use findermeister_core::AggregateId;

use crate::app::errors;

/// Parse a path/body id, mapping failure to a 400 with a domain-specific
/// message.
pub fn parse_id(raw: &str, what: &'static str) -> Result<AggregateId, Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
