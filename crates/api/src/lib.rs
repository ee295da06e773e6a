//! Segment annotation API server library.
//!
//! Exposes the building blocks (config, state, error handling, the merge
//! pipeline, the background flusher, routes) so integration tests and the
//! binary entrypoint can both access them.

pub mod background;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;
