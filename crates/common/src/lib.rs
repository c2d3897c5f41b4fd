//! Common types, protocol definitions, and errors shared across `user-sso` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
pub use protocol::{AccessItem, OAuthToken, UserInfo};
