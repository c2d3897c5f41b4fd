//! In-process SSO server for tests, bound to an ephemeral local port.

use std::collections::HashMap;

use axum::{
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use common::protocol::AccessItems;
use common::AccessItem;
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};

use super::{SsoClient, SsoConfig};

pub const CLIENT_ID: &str = "gateway";
pub const CLIENT_SECRET: &str = "csecret";
pub const REDIRECT_URL: &str = "http://app.example.com/callback";

pub const GOOD_CODE: &str = "good-code";
/// Exchanges fine, but the user-info endpoint answers with garbage.
pub const GARBAGE_CODE: &str = "garbage-code";
pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "wonderland";

pub const ACCESS_TOKEN: &str = "at-1";
pub const REFRESHED_ACCESS_TOKEN: &str = "at-2";
pub const GARBAGE_ACCESS_TOKEN: &str = "at-garbage";
pub const REFRESH_TOKEN: &str = "rt-1";

/// A running mock server. Stops when dropped.
pub struct MockSso {
    pub endpoint: String,
    task: JoinHandle<()>,
}

impl MockSso {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/oauth/user", get(user))
            .route("/user/access", post(access));
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self {
            endpoint: format!("http://{addr}/"),
            task,
        }
    }

    pub fn config(&self) -> SsoConfig {
        SsoConfig {
            endpoint: self.endpoint.clone(),
            client_id: CLIENT_ID.into(),
            client_secret: CLIENT_SECRET.into(),
            redirect_url: REDIRECT_URL.into(),
            scopes: vec!["profile".into()],
        }
    }

    pub fn client(&self) -> SsoClient {
        SsoClient::new(self.config()).unwrap()
    }
}

impl Drop for MockSso {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    if field(&form, "client_id") != CLIENT_ID || field(&form, "client_secret") != CLIENT_SECRET {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_client"}))).into_response();
    }

    match field(&form, "grant_type") {
        "authorization_code" if field(&form, "code") == GOOD_CODE && field(&form, "redirect_uri") == REDIRECT_URL => {
            issue(ACCESS_TOKEN, Some(REFRESH_TOKEN))
        }
        "authorization_code" if field(&form, "code") == GARBAGE_CODE => issue(GARBAGE_ACCESS_TOKEN, None),
        "password" if field(&form, "username") == USERNAME && field(&form, "password") == PASSWORD => {
            issue(ACCESS_TOKEN, Some(REFRESH_TOKEN))
        }
        "refresh_token" if field(&form, "refresh_token") == REFRESH_TOKEN => {
            issue(REFRESHED_ACCESS_TOKEN, None)
        }
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"}))).into_response(),
    }
}

fn field<'a>(form: &'a HashMap<String, String>, key: &str) -> &'a str {
    form.get(key).map(String::as_str).unwrap_or_default()
}

fn issue(access_token: &str, refresh_token: Option<&str>) -> Response {
    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = json!(refresh);
    }
    Json(body).into_response()
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn user(headers: HeaderMap) -> Response {
    match bearer(&headers) {
        ACCESS_TOKEN | REFRESHED_ACCESS_TOKEN => Json(json!({
            "name": "alice",
            "email": "alice@example.com",
            "md": {"tenant": "t1"},
        }))
        .into_response(),
        GARBAGE_ACCESS_TOKEN => "<html>".into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn access(headers: HeaderMap, Json(req): Json<AccessItems>) -> Response {
    if !matches!(bearer(&headers), ACCESS_TOKEN | REFRESHED_ACCESS_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if req.items.iter().any(|i| i.resource == "boom") {
        return Json(json!({"code": 500, "msg": "boom"})).into_response();
    }
    let data: Vec<AccessItem> = req
        .items
        .into_iter()
        .map(|mut item| {
            item.ok = item.resource != "secret";
            item
        })
        .collect();
    Json(json!({"code": 200, "msg": "ok", "data": data})).into_response()
}
