//! `sso-gateway` — binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise structured logging.
//! 3. Build the session token pipeline.
//! 4. Build the SSO client and session helper.
//! 5. Build the Axum router and serve until Ctrl-C.

mod config;
mod server;
mod session;
mod sso;
mod telemetry;

use anyhow::{Context, Result};
use chrono::Duration;
use token_codec::PipelineConfig;
use tracing::info;

use config::Config;
use server::state::AppState;
use session::SessionHelper;
use sso::SsoClient;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        compression = cfg.token_compression,
        "sso-gateway starting"
    );

    // -----------------------------------------------------------------------
    // 3. Session token pipeline
    // -----------------------------------------------------------------------
    let pipeline = PipelineConfig::new(cfg.token_secret.expose(), cfg.pipeline_options())
        .context("failed to build token pipeline")?;

    // -----------------------------------------------------------------------
    // 4. SSO client and session transport
    // -----------------------------------------------------------------------
    let sso = SsoClient::new(cfg.sso()).context("failed to build SSO client")?;
    let session = SessionHelper::new(&cfg.header_key, &cfg.cookie_key)
        .context("invalid session transport settings")?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(
        pipeline,
        sso,
        session,
        cfg.cookie(),
        Duration::seconds(cfg.refresh_threshold_secs),
    );
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("sso-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
