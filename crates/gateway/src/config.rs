//! Configuration loading and validation for the gateway.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;
use token_codec::PipelineOption;

use crate::session::CookieOptions;
use crate::sso::SsoConfig;

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Validated gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the SSO server. **Required.**
    pub sso_endpoint: String,

    /// OAuth2 client id registered with the SSO server. **Required.**
    pub client_id: String,

    /// OAuth2 client secret. **Required.**
    pub client_secret: Secret,

    /// Redirect URI sent with authorize and code-exchange requests.
    #[serde(default)]
    pub redirect_url: String,

    /// Comma separated OAuth2 scopes.
    #[serde(default)]
    pub scopes: String,

    /// Secret the session tokens are encrypted with. **Required.**
    pub token_secret: Secret,

    /// Gzip session tokens after encryption.
    #[serde(default)]
    pub token_compression: bool,

    /// Upper bound on the decompressed size of an incoming token.
    #[serde(default = "default_token_max_decoded_bytes")]
    pub token_max_decoded_bytes: usize,

    /// Request/response header carrying the session token.
    #[serde(default = "default_header_key")]
    pub header_key: String,

    /// Cookie carrying the session token.
    #[serde(default = "default_cookie_key")]
    pub cookie_key: String,

    /// Session cookie lifetime in seconds. `0` issues a browser-session cookie.
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: i64,

    #[serde(default)]
    pub cookie_domain: String,

    #[serde(default = "default_true")]
    pub cookie_secure: bool,

    /// Remaining OAuth token lifetime below which `/me` refreshes it.
    #[serde(default = "default_refresh_threshold")]
    pub refresh_threshold_secs: i64,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_token_max_decoded_bytes() -> usize {
    64 * 1024
}
fn default_header_key() -> String {
    "X-User-Token".into()
}
fn default_cookie_key() -> String {
    "user_token".into()
}
fn default_cookie_max_age() -> i64 {
    86_400
}
fn default_true() -> bool {
    true
}
fn default_refresh_threshold() -> i64 {
    300
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.sso_endpoint, "SSO_ENDPOINT")?;
        ensure_non_empty(&self.client_id, "CLIENT_ID")?;
        ensure_non_empty(self.client_secret.expose(), "CLIENT_SECRET")?;
        // Not trimmed: whitespace is a legal key byte.
        if self.token_secret.expose().is_empty() {
            anyhow::bail!("TOKEN_SECRET is required and must not be empty");
        }
        ensure_non_empty(&self.header_key, "HEADER_KEY")?;
        ensure_non_empty(&self.cookie_key, "COOKIE_KEY")?;

        if self.token_max_decoded_bytes == 0 {
            anyhow::bail!("TOKEN_MAX_DECODED_BYTES must be > 0");
        }
        if self.cookie_max_age_secs < 0 {
            anyhow::bail!("COOKIE_MAX_AGE_SECS must be >= 0");
        }
        if self.refresh_threshold_secs < 0 {
            anyhow::bail!("REFRESH_THRESHOLD_SECS must be >= 0");
        }
        Ok(())
    }

    /// Settings for the SSO client.
    pub fn sso(&self) -> SsoConfig {
        SsoConfig {
            endpoint: self.sso_endpoint.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.expose().to_owned(),
            redirect_url: self.redirect_url.clone(),
            scopes: self
                .scopes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Options for the session token pipeline.
    pub fn pipeline_options(&self) -> Vec<PipelineOption> {
        vec![
            PipelineOption::Compression(self.token_compression),
            PipelineOption::DecompressionLimit(self.token_max_decoded_bytes),
        ]
    }

    /// Attributes of the session cookie.
    pub fn cookie(&self) -> CookieOptions {
        CookieOptions {
            max_age: self.cookie_max_age_secs,
            path: "/".into(),
            domain: self.cookie_domain.clone(),
            secure: self.cookie_secure,
            http_only: true,
        }
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
