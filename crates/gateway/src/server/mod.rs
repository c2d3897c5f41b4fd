//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Restore the session user from the request token (`authenticate`).
//! - Inject shared application state (`AppState`) into handlers.
//! - Map domain errors to JSON error responses.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
