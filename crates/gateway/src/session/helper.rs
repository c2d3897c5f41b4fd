//! Reading and writing session tokens on HTTP messages.

use axum::http::{
    header::{self, InvalidHeaderValue},
    Extensions, HeaderMap, HeaderName, HeaderValue,
};
use common::UserInfo;
use cookie::{time::Duration, Cookie};
use thiserror::Error;

/// Attributes for a `Set-Cookie` header.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Lifetime in seconds. `0` leaves `Max-Age` off (browser-session cookie).
    pub max_age: i64,
    pub path: String,
    /// Omitted from the cookie when empty.
    pub domain: String,
    pub secure: bool,
    pub http_only: bool,
}

impl CookieOptions {
    /// Same attributes with a different lifetime.
    pub fn with_max_age(&self, max_age: i64) -> Self {
        Self {
            max_age,
            ..self.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),

    #[error("value cannot be carried in a header: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}

/// No user was attached to the request.
#[derive(Debug, Clone, Copy, Error)]
#[error("not login")]
pub struct NotLoggedIn;

/// Request extension holding the authenticated user.
#[derive(Debug, Clone)]
struct SessionUser(UserInfo);

/// Knows where session tokens travel: one header and one cookie.
#[derive(Debug, Clone)]
pub struct SessionHelper {
    header_key: HeaderName,
    cookie_key: String,
}

impl SessionHelper {
    pub fn new(header_key: &str, cookie_key: &str) -> Result<Self, SessionError> {
        let header_key = HeaderName::try_from(header_key)
            .map_err(|_| SessionError::InvalidHeaderName(header_key.to_owned()))?;
        Ok(Self {
            header_key,
            cookie_key: cookie_key.to_owned(),
        })
    }

    /// Token from the header, falling back to the cookie.
    pub fn from_request(&self, headers: &HeaderMap) -> Option<String> {
        self.from_header(headers)
            .or_else(|| self.from_cookie(headers))
    }

    pub fn from_header(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.header_key)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    pub fn from_cookie(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, &self.cookie_key)
    }

    /// Put `token` in the session header, replacing any previous value.
    pub fn with_header(&self, headers: &mut HeaderMap, token: &str) -> Result<(), SessionError> {
        headers.insert(self.header_key.clone(), HeaderValue::from_str(token)?);
        Ok(())
    }

    /// Append a `Set-Cookie` carrying `token`.
    pub fn with_cookie(
        &self,
        headers: &mut HeaderMap,
        token: &str,
        opts: &CookieOptions,
    ) -> Result<(), SessionError> {
        set_cookie(headers, &self.cookie_key, token, opts)
    }

    /// Append a `Set-Cookie` that deletes the session cookie.
    pub fn expire_cookie(&self, headers: &mut HeaderMap, opts: &CookieOptions) -> Result<(), SessionError> {
        expire_cookie(headers, &self.cookie_key, opts)
    }

    pub fn from_extensions(extensions: &Extensions) -> Result<UserInfo, NotLoggedIn> {
        extensions
            .get::<SessionUser>()
            .map(|u| u.0.clone())
            .ok_or(NotLoggedIn)
    }

    pub fn with_extensions(extensions: &mut Extensions, user: UserInfo) {
        extensions.insert(SessionUser(user));
    }
}

/// First non-empty value of cookie `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse_encoded(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

pub fn set_cookie(
    headers: &mut HeaderMap,
    name: &str,
    value: &str,
    opts: &CookieOptions,
) -> Result<(), SessionError> {
    append(headers, build(name, value, opts))
}

pub fn expire_cookie(headers: &mut HeaderMap, name: &str, opts: &CookieOptions) -> Result<(), SessionError> {
    let mut cookie = build(name, "", opts);
    cookie.make_removal();
    append(headers, cookie)
}

fn build(name: &str, value: &str, opts: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_owned(), value.to_owned()))
        .path(opts.path.clone())
        .secure(opts.secure)
        .http_only(opts.http_only);
    if opts.max_age > 0 {
        builder = builder.max_age(Duration::seconds(opts.max_age));
    }
    if !opts.domain.is_empty() {
        builder = builder.domain(opts.domain.clone());
    }
    builder.build()
}

fn append(headers: &mut HeaderMap, cookie: Cookie<'_>) -> Result<(), SessionError> {
    let value = HeaderValue::from_str(&cookie.encoded().to_string())?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}
