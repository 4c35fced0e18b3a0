//! Finds domain module (client-posted requests, event-sourced).
//!
//! A "find" is a client's request to locate a product or service. Business
//! rules here are pure deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod find;

pub use find::{
    CloseFind, Find, FindClosed, FindCommand, FindEvent, FindId, FindPosted, FindStatus,
    FindUpdated, PostFind, UpdateFind,
};
