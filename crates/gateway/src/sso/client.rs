//! HTTP client for the SSO server's OAuth2 and account endpoints.

use std::collections::BTreeMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use common::protocol::AccessResponse;
use common::{AccessItem, OAuthToken, UserInfo};
use reqwest::{header, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::SsoError;

/// Per-request timeout for calls to the SSO server.
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Settings for [`SsoClient`].
#[derive(Clone, Default)]
pub struct SsoConfig {
    /// Base URL of the SSO server. Trailing `/` and `?` are ignored.
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// Sent as `redirect_uri` when non-empty.
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl std::fmt::Debug for SsoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoConfig")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_url", &self.redirect_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// OAuth2 client bound to one SSO server.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone)]
pub struct SsoClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    scopes: Vec<String>,
    authorize_endpoint: Url,
    token_endpoint: Url,
    user_endpoint: Url,
    logout_endpoint: Url,
    access_endpoint: Url,
}

impl std::fmt::Debug for SsoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoClient")
            .field("client_id", &self.client_id)
            .field("token_endpoint", &self.token_endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// Token endpoint response body (RFC 6749 §5.1).
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: DateTime<Utc>) -> Result<OAuthToken, SsoError> {
        if self.access_token.is_empty() {
            return Err(SsoError::InvalidTokenResponse(
                "server response missing access_token".into(),
            ));
        }
        Ok(OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        })
    }
}

#[derive(Serialize)]
struct AccessRequest<'a> {
    items: &'a [AccessItem],
}

impl SsoClient {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// [`SsoError::InvalidEndpoint`] if `cfg.endpoint` is not an absolute URL.
    pub fn new(cfg: SsoConfig) -> Result<Self, SsoError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_http_client(cfg, http)
    }

    /// Build a client on top of an existing `reqwest` client.
    pub fn with_http_client(cfg: SsoConfig, http: reqwest::Client) -> Result<Self, SsoError> {
        let base = cfg.endpoint.trim_end_matches(['/', '?']);
        let join = |path: &str| {
            Url::parse(&format!("{base}{path}"))
                .map_err(|_| SsoError::InvalidEndpoint(cfg.endpoint.clone()))
        };
        let authorize_endpoint = join("/oauth/authorize")?;
        let token_endpoint = join("/oauth/token")?;
        let user_endpoint = join("/oauth/user")?;
        let logout_endpoint = join("/user/logout")?;
        let access_endpoint = join("/user/access")?;

        Ok(Self {
            http,
            client_id: cfg.client_id,
            client_secret: cfg.client_secret,
            redirect_url: cfg.redirect_url,
            scopes: cfg.scopes,
            authorize_endpoint,
            token_endpoint,
            user_endpoint,
            logout_endpoint,
            access_endpoint,
        })
    }

    /// URL of the SSO consent page. Query keys are emitted in sorted order;
    /// `extra` pairs override the standard ones.
    pub fn auth_url(&self, state: &str, extra: &[(&str, &str)]) -> String {
        let scope = self.scopes.join(" ");
        let mut params: BTreeMap<&str, &str> = BTreeMap::new();
        params.insert("response_type", "code");
        params.insert("client_id", &self.client_id);
        if !self.redirect_url.is_empty() {
            params.insert("redirect_uri", &self.redirect_url);
        }
        if !scope.is_empty() {
            params.insert("scope", &scope);
        }
        if !state.is_empty() {
            params.insert("state", state);
        }
        for &(key, value) in extra {
            params.insert(key, value);
        }

        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut().extend_pairs(params);
        url.into()
    }

    /// URL that ends the SSO session and optionally sends the browser back.
    pub fn logout_url(&self, return_url: &str) -> String {
        let mut url = self.logout_endpoint.clone();
        if !return_url.is_empty() {
            url.query_pairs_mut().append_pair("return_url", return_url);
        }
        url.into()
    }

    /// Trade an authorization code for a token and the user it belongs to.
    pub async fn exchange(&self, code: &str, extra: &[(&str, &str)]) -> Result<UserInfo, SsoError> {
        let mut grant = vec![("grant_type", "authorization_code"), ("code", code)];
        if !self.redirect_url.is_empty() {
            grant.push(("redirect_uri", self.redirect_url.as_str()));
        }
        grant.extend_from_slice(extra);

        let token = self.token_request(&grant).await?;
        self.fetch_user(token).await
    }

    /// Resource-owner password grant.
    pub async fn password_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserInfo, SsoError> {
        let scope = self.scopes.join(" ");
        let mut grant = vec![
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        if !scope.is_empty() {
            grant.push(("scope", scope.as_str()));
        }

        let token = self.token_request(&grant).await?;
        self.fetch_user(token).await
    }

    /// Replace the user's OAuth token if it is no longer valid.
    ///
    /// A token with more than 10 seconds left (or no expiry) is kept as is.
    pub async fn refresh_token(&self, user: &mut UserInfo) -> Result<(), SsoError> {
        if user.token.as_ref().is_some_and(OAuthToken::is_valid) {
            return Ok(());
        }
        self.renew(user).await
    }

    /// Run the refresh grant unconditionally.
    ///
    /// The old refresh token is kept when the server does not rotate it.
    pub async fn renew(&self, user: &mut UserInfo) -> Result<(), SsoError> {
        let refresh = user
            .token
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .filter(|r| !r.is_empty())
            .ok_or(SsoError::MissingRefreshToken)?;

        let mut fresh = self
            .token_request(&[("grant_type", "refresh_token"), ("refresh_token", refresh.as_str())])
            .await?;
        if fresh.refresh_token.is_empty() {
            fresh.refresh_token = refresh;
        }
        user.token = Some(fresh);
        debug!(user = %user.name, "oauth token renewed");
        Ok(())
    }

    /// Whether the user's token has less than `threshold` left to live.
    ///
    /// A user without a token counts as expiring; a token without expiry never does.
    pub fn expiration_soon(&self, user: &UserInfo, threshold: Duration) -> bool {
        user.token
            .as_ref()
            .map_or(true, |t| t.expires_within(threshold))
    }

    /// Look up the owner of `token` and attach the token to the result.
    pub async fn fetch_user(&self, token: OAuthToken) -> Result<UserInfo, SsoError> {
        let resp = self
            .http
            .get(self.user_endpoint.clone())
            .header(header::AUTHORIZATION, token.access_token.as_str())
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "user info request rejected");
            return Err(SsoError::FetchUserInfo);
        }

        let mut user: UserInfo = resp.json().await.map_err(|e| {
            warn!(error = %e, "undecodable user info");
            SsoError::FetchUserInfo
        })?;
        user.token = Some(token);
        Ok(user)
    }

    /// Ask the SSO server which of `items` the token holder may perform.
    pub async fn authentication(
        &self,
        access_token: &str,
        items: &[AccessItem],
    ) -> Result<Vec<AccessItem>, SsoError> {
        if items.is_empty() {
            return Err(SsoError::NoAccessItems);
        }

        let resp = self
            .http
            .post(self.access_endpoint.clone())
            .header(header::AUTHORIZATION, access_token)
            .json(&AccessRequest { items })
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "access request rejected");
            return Err(SsoError::AccessRequestFailed);
        }

        let body: AccessResponse = resp.json().await.map_err(|e| {
            warn!(error = %e, "undecodable access response");
            SsoError::AccessRequestFailed
        })?;
        if body.code != 200 {
            return Err(SsoError::AccessDenied {
                code: body.code,
                msg: body.msg,
            });
        }
        Ok(body.data.unwrap_or_default())
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<OAuthToken, SsoError> {
        let mut form = grant.to_vec();
        form.push(("client_id", self.client_id.as_str()));
        form.push(("client_secret", self.client_secret.as_str()));

        let resp = self
            .http
            .post(self.token_endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "token request rejected");
            return Err(SsoError::TokenRequest {
                status: status.as_u16(),
                body,
            });
        }

        let raw: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| SsoError::InvalidTokenResponse(e.to_string()))?;
        raw.into_token(Utc::now())
    }
}
