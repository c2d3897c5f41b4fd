//! OAuth2 client for the SSO server.
//!
//! Covers the authorization-code and password grants, token refresh, user-info
//! lookup and batch access checks. Every user-facing result is a
//! [`common::UserInfo`] carrying its OAuth token, ready to be sealed into a
//! session token.

pub mod client;
pub mod error;

#[cfg(test)]
pub mod testing;

pub use client::{SsoClient, SsoConfig};
pub use error::SsoError;
