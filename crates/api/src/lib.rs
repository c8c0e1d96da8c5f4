//! Pictura API server library.
//!
//! Exposes the building blocks (config, state, error handling, storage,
//! routes) so integration tests and the binary entrypoint can both use them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
