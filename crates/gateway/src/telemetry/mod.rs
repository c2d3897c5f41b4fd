//! Structured logging for the gateway.
//!
//! # Telemetry invariants
//!
//! - **No secrets, session tokens, OAuth tokens or passwords** may appear in
//!   any log field. Log user identity by name only.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
