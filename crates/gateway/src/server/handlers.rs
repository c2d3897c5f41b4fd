//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    AccessItems, ErrorResponse, HealthResponse, PasswordLoginRequest, SessionResponse,
};
use common::{AccessItem, OAuthToken, ServiceError, UserInfo};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{error::ApiError, state::AppState};
use crate::session::{helper, CurrentUser};

/// Cookie remembering the OAuth `state` between `/login` and `/callback`.
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Lifetime of [`OAUTH_STATE_COOKIE`] in seconds.
const OAUTH_STATE_MAX_AGE: i64 = 600;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    #[serde(default)]
    pub return_url: String,
}

/// `GET /login` — send the browser to the SSO consent page.
///
/// A random `state` is generated unless the caller supplies one; either way it
/// is remembered in a short-lived cookie for `/callback` to check.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let oauth_state = if query.state.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        query.state
    };

    let mut headers = HeaderMap::new();
    helper::set_cookie(
        &mut headers,
        OAUTH_STATE_COOKIE,
        &oauth_state,
        &state.cookie.with_max_age(OAUTH_STATE_MAX_AGE),
    )?;
    redirect(&state.sso.auth_url(&oauth_state, &[]), headers)
}

/// `GET /callback` — finish the authorization-code flow and issue a session.
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    if query.code.is_empty() {
        return Err(ServiceError::BadRequest("missing code".into()).into());
    }
    let expected = helper::read_cookie(&headers, OAUTH_STATE_COOKIE);
    if query.state.is_empty() || expected.as_deref() != Some(query.state.as_str()) {
        return Err(ServiceError::BadRequest("oauth state mismatch".into()).into());
    }

    let user = state.sso.exchange(&query.code, &[]).await?;
    let mut resp = issue_session(&state, &user)?;
    helper::expire_cookie(resp.headers_mut(), OAUTH_STATE_COOKIE, &state.cookie)?;
    Ok(resp)
}

/// `POST /login/password` — resource-owner password login.
pub async fn password_login(
    State(state): State<AppState>,
    Json(req): Json<PasswordLoginRequest>,
) -> Result<Response, ApiError> {
    if req.username.is_empty() {
        return Err(ServiceError::BadRequest("missing username".into()).into());
    }
    let user = state
        .sso
        .password_credentials(&req.username, &req.password)
        .await?;
    issue_session(&state, &user)
}

/// `GET /logout` — drop the session cookie and end the SSO session.
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<LogoutQuery>,
) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    state.session.expire_cookie(&mut headers, &state.cookie)?;
    redirect(&state.sso.logout_url(&query.return_url), headers)
}

/// `GET /me` — the logged-in user, without its OAuth token.
///
/// An OAuth token close to expiry is renewed first and the session token
/// re-issued in both the cookie and the session header. A failed renewal is
/// only an error once the current token is no longer valid.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    if state.sso.expiration_soon(&user, state.refresh_threshold) {
        match state.sso.renew(&mut user).await {
            Ok(()) => {
                reissue(&state, &user, &mut headers)?;
                info!(user = %user.name, "session renewed");
            }
            Err(e) if user.token.as_ref().is_some_and(OAuthToken::is_valid) => {
                warn!(user = %user.name, error = %e, "renewal failed, keeping current token");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok((headers, Json(user.without_token())).into_response())
}

/// `POST /access` — batch authorisation check for the logged-in user.
///
/// An expired OAuth token is refreshed before the check is forwarded. The
/// re-issued session travels with the response whether or not the check
/// succeeds.
pub async fn access(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    Json(req): Json<AccessItems>,
) -> Result<Response, ApiError> {
    if req.items.is_empty() {
        return Err(ServiceError::BadRequest("no access items".into()).into());
    }

    let mut headers = HeaderMap::new();
    let before = user.token.clone();
    state.sso.refresh_token(&mut user).await?;
    if user.token != before {
        reissue(&state, &user, &mut headers)?;
    }

    let resp = match check_access(&state, &user, &req.items).await {
        Ok(items) => (headers, Json(AccessItems { items })).into_response(),
        Err(e) => (headers, e).into_response(),
    };
    Ok(resp)
}

async fn check_access(
    state: &AppState,
    user: &UserInfo,
    items: &[AccessItem],
) -> Result<Vec<AccessItem>, ApiError> {
    let access_token = user
        .token
        .as_ref()
        .map(|t| t.access_token.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("session has no oauth token".into()))?;
    Ok(state.sso.authentication(access_token, items).await?)
}

/// `GET /health` — liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        compression: state.pipeline.compression_enabled(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Seal `user` into a token and hand it out as cookie, header and JSON body.
fn issue_session(state: &AppState, user: &UserInfo) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    let token = reissue(state, user, &mut headers)?;
    info!(user = %user.name, "session issued");
    Ok((headers, Json(SessionResponse { token })).into_response())
}

/// Seal `user` into a fresh token and set it as session cookie and header.
fn reissue(state: &AppState, user: &UserInfo, headers: &mut HeaderMap) -> Result<String, ApiError> {
    let token = state.pipeline.encode(user)?;
    state.session.with_cookie(headers, &token, &state.cookie)?;
    state.session.with_header(headers, &token)?;
    Ok(token)
}

fn redirect(location: &str, mut headers: HeaderMap) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| ServiceError::Internal("unrepresentable redirect target".into()))?;
    headers.insert(LOCATION, value);
    Ok((StatusCode::FOUND, headers).into_response())
}
