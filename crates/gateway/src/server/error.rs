//! Conversion of handler errors into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use common::ServiceError;
use token_codec::EncodeError;
use tracing::{error, warn};

use crate::session::SessionError;
use crate::sso::SsoError;

/// Error returned by handlers; renders as an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse::new(self.0.code(), self.0.message());
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl From<SsoError> for ApiError {
    fn from(e: SsoError) -> Self {
        warn!(error = %e, "sso call failed");
        let mapped = match e {
            SsoError::TokenRequest { status, .. } if (400..500).contains(&status) => {
                ServiceError::Unauthorized("rejected by SSO server".into())
            }
            SsoError::MissingRefreshToken => ServiceError::Unauthorized("session expired".into()),
            SsoError::NoAccessItems => ServiceError::BadRequest("no access items".into()),
            SsoError::AccessDenied { code, msg } => {
                ServiceError::Forbidden(format!("access failed: code={code}, message={msg}"))
            }
            SsoError::InvalidEndpoint(_) => ServiceError::Internal("SSO client misconfigured".into()),
            SsoError::FetchUserInfo => ServiceError::Upstream("fetch user info error".into()),
            SsoError::AccessRequestFailed => ServiceError::Upstream("access request failed".into()),
            SsoError::Http(_) | SsoError::TokenRequest { .. } | SsoError::InvalidTokenResponse(_) => {
                ServiceError::Upstream("SSO server unavailable".into())
            }
        };
        Self(mapped)
    }
}

impl From<EncodeError> for ApiError {
    fn from(e: EncodeError) -> Self {
        error!(error = %e, "session token encoding failed");
        Self(ServiceError::Internal("could not issue session token".into()))
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        error!(error = %e, "session transport failed");
        Self(ServiceError::Internal("could not attach session".into()))
    }
}
