//! HTTP API: server, routing, and request/response mapping.
//!
//! This crate is the authoritative enforcement point: every mutation handler
//! checks the ban state first, then the role, before touching any aggregate.

pub mod app;
pub mod authz;
pub mod capability;
pub mod middleware;
