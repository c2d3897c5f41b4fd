//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use chrono::Duration;
use token_codec::PipelineConfig;

use crate::session::{CookieOptions, SessionHelper};
use crate::sso::SsoClient;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying expensive data.
#[derive(Clone)]
pub struct AppState {
    /// Seals users into session tokens and opens them again.
    pub pipeline: PipelineConfig,
    pub sso: Arc<SsoClient>,
    pub session: Arc<SessionHelper>,
    /// Attributes of the session cookie.
    pub cookie: Arc<CookieOptions>,
    /// Remaining OAuth token lifetime below which `/me` renews it.
    pub refresh_threshold: Duration,
}

impl AppState {
    pub fn new(
        pipeline: PipelineConfig,
        sso: SsoClient,
        session: SessionHelper,
        cookie: CookieOptions,
        refresh_threshold: Duration,
    ) -> Self {
        Self {
            pipeline,
            sso: Arc::new(sso),
            session: Arc::new(session),
            cookie: Arc::new(cookie),
            refresh_threshold,
        }
    }
}
