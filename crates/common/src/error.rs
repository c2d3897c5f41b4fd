//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::Unauthorized`] → 401
/// - [`ServiceError::Forbidden`] → 403
/// - [`ServiceError::Upstream`] → 502
/// - [`ServiceError::Internal`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: missing parameter, state mismatch, or invalid JSON.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No valid session token accompanied the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The SSO server denied the requested access.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The SSO server failed or returned something unusable.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::Forbidden(_) => 403,
            ServiceError::Upstream(_) => 502,
            ServiceError::Internal(_) => 500,
        }
    }

    /// The message without the category prefix, safe to return to callers.
    pub fn message(&self) -> &str {
        match self {
            ServiceError::BadRequest(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::Forbidden(m)
            | ServiceError::Upstream(m)
            | ServiceError::Internal(m) => m,
        }
    }

    /// Short machine-readable code used in [`ErrorResponse`](crate::protocol::ErrorResponse).
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unauthorized(_) => "not_logged_in",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Upstream(_) => "upstream_error",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
