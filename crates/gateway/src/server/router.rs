//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/login", get(handlers::login))
        .route("/login/password", post(handlers::password_login))
        .route("/callback", get(handlers::callback))
        .route("/logout", get(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/access", post(handlers::access))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .with_state(state)
}
