//! Error types for SSO server interaction.

use thiserror::Error;

/// Errors that can occur while talking to the SSO server.
#[derive(Debug, Error)]
pub enum SsoError {
    /// The configured endpoint does not form valid URLs.
    #[error("invalid SSO endpoint {0:?}")]
    InvalidEndpoint(String),

    /// Transport failure: connect, timeout or body read.
    #[error("SSO request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token request rejected with status {status}: {body}")]
    TokenRequest { status: u16, body: String },

    /// The token endpoint answered 2xx but the body is not a usable token.
    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("fetch user info error")]
    FetchUserInfo,

    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("no access items")]
    NoAccessItems,

    #[error("access request failed")]
    AccessRequestFailed,

    /// The access endpoint answered with a non-200 application code.
    #[error("access failed: code={code}, message={msg}")]
    AccessDenied { code: i64, msg: String },
}
