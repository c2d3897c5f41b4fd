//! Axum middleware applied to the router.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use common::UserInfo;
use tracing::debug;

use super::state::AppState;
use crate::session::SessionHelper;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Decode the session token, if any, and attach the user to the request.
///
/// Requests without a usable token continue anonymously; routes that need a
/// user reject them through the `CurrentUser` extractor.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match state.session.from_request(req.headers()) {
        Some(token) => match state.pipeline.decode::<UserInfo>(&token) {
            Ok(user) => {
                debug!(user = %user.name, "session restored");
                SessionHelper::with_extensions(req.extensions_mut(), user);
            }
            Err(e) => debug!(error = %e, "ignoring undecodable session token"),
        },
        None => debug!("no session token"),
    }
    next.run(req).await
}
