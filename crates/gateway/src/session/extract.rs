//! Axum extractor for the authenticated user.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use common::{ServiceError, UserInfo};

use super::helper::{NotLoggedIn, SessionHelper};
use crate::server::error::ApiError;

/// The user the `authenticate` middleware attached to this request.
///
/// Rejects with `401 not_logged_in` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserInfo);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = NotLoggedIn;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SessionHelper::from_extensions(&parts.extensions).map(CurrentUser)
    }
}

impl IntoResponse for NotLoggedIn {
    fn into_response(self) -> Response {
        ApiError(ServiceError::Unauthorized(self.to_string())).into_response()
    }
}
