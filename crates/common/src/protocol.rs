//! Request and response types exchanged between components.
//!
//! [`UserInfo`] doubles as the payload of the session token, so its JSON field
//! names are part of the token format and must not change.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tokens this close to expiry are treated as already expired.
pub const EXPIRY_DELTA_SECS: i64 = 10;

// ---------------------------------------------------------------------------
// Session payload
// ---------------------------------------------------------------------------

/// User profile returned by the SSO server and carried in the session token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Email address.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,

    /// Base64 avatar image.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub avatar: String,

    /// OAuth token the profile was fetched with.
    ///
    /// Serialised under `"encoder"` (and as `null` when absent) to stay
    /// readable by tokens issued before this crate existed.
    #[serde(rename = "encoder", default)]
    pub token: Option<OAuthToken>,

    /// Caller-defined metadata.
    #[serde(rename = "md", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl UserInfo {
    /// Metadata value for `key`, or `""` when unset.
    pub fn get(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or_default()
    }

    /// Set a metadata value, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Copy of this profile with the OAuth token removed, safe to hand to browsers.
    pub fn without_token(&self) -> Self {
        Self {
            token: None,
            ..self.clone()
        }
    }
}

/// OAuth2 token in the JSON shape of the Go `oauth2.Token` type.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,

    /// `None` means the token never expires. Serialised as the zero time.
    #[serde(default, with = "expiry")]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Whether the token carries an access token that is not (about to be) expired.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.expires_within(Duration::seconds(EXPIRY_DELTA_SECS))
    }

    /// Whether the token expires within `window` from now. Never true without an expiry.
    pub fn expires_within(&self, window: Duration) -> bool {
        match self.expiry {
            Some(expiry) => expiry - Utc::now() < window,
            None => false,
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Serde adapter for the Go zero-time convention (`0001-01-01T00:00:00Z` = no expiry).
mod expiry {
    use chrono::{DateTime, Datelike, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_str(ZERO_TIME),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let t = DateTime::parse_from_rfc3339(&raw)
            .map_err(de::Error::custom)?
            .with_timezone(&Utc);
        Ok((t.year() > 1).then_some(t))
    }
}

// ---------------------------------------------------------------------------
// Batch authorization
// ---------------------------------------------------------------------------

/// One resource/action pair to authorise. The server fills in `ok`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ok: bool,
}

impl AccessItem {
    /// Construct an unresolved item.
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            ok: false,
        }
    }
}

/// Request body for the SSO access endpoint and for `POST /access`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessItems {
    pub items: Vec<AccessItem>,
}

/// Response body of the SSO access endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Option<Vec<AccessItem>>,
}

// ---------------------------------------------------------------------------
// Gateway endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /login/password`.
#[derive(Clone, Deserialize, Serialize)]
pub struct PasswordLoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for PasswordLoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordLoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login response: the encoded session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Whether issued tokens are gzip-compressed.
    pub compression: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn user_info_field_names() {
        let mut user = UserInfo {
            name: "aaa".into(),
            ..Default::default()
        };
        user.set("a", "b");
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value, json!({"name": "aaa", "encoder": null, "md": {"a": "b"}}));
    }

    #[test]
    fn user_info_field_order_is_stable() {
        let user = UserInfo {
            name: "n".into(),
            email: "e".into(),
            avatar: "a".into(),
            token: None,
            metadata: BTreeMap::from([("k".into(), "v".into())]),
        };
        assert_eq!(
            serde_json::to_string(&user).unwrap(),
            r#"{"name":"n","email":"e","avatar":"a","encoder":null,"md":{"k":"v"}}"#
        );
    }

    #[test]
    fn metadata_get_and_set() {
        let mut user = UserInfo::default();
        assert_eq!(user.get("missing"), "");
        user.set("tenant", "t1");
        user.set("tenant", "t2");
        assert_eq!(user.get("tenant"), "t2");
    }

    #[test]
    fn without_token_strips_only_the_token() {
        let user = UserInfo {
            name: "aaa".into(),
            token: Some(OAuthToken {
                access_token: "at".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let stripped = user.without_token();
        assert!(stripped.token.is_none());
        assert_eq!(stripped.name, "aaa");
    }

    #[test]
    fn oauth_token_zero_expiry_means_none() {
        let token: OAuthToken = serde_json::from_value(json!({
            "access_token": "at",
            "token_type": "Bearer",
            "expiry": "0001-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(token.expiry, None);
        assert!(token.is_valid());

        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["expiry"], "0001-01-01T00:00:00Z");
        assert!(value.get("refresh_token").is_none());
    }

    #[test]
    fn oauth_token_expiry_round_trip() {
        let expiry = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap();
        let token = OAuthToken {
            access_token: "at".into(),
            token_type: "Bearer".into(),
            refresh_token: "rt".into(),
            expiry: Some(expiry),
        };
        let json = serde_json::to_string(&token).unwrap();
        assert!(json.contains("2030-05-01T12:00:00Z"));
        let decoded: OAuthToken = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn oauth_token_accepts_offsets_and_fractions() {
        let token: OAuthToken = serde_json::from_value(json!({
            "access_token": "at",
            "expiry": "2030-05-01T20:00:00.123456789+08:00"
        }))
        .unwrap();
        assert_eq!(
            token.expiry.unwrap().timestamp(),
            Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap().timestamp()
        );
    }

    #[test]
    fn oauth_token_validity() {
        let mut token = OAuthToken {
            access_token: "at".into(),
            expiry: Some(Utc::now() + Duration::hours(1)),
            ..Default::default()
        };
        assert!(token.is_valid());
        assert!(token.expires_within(Duration::hours(2)));
        assert!(!token.expires_within(Duration::minutes(30)));

        token.expiry = Some(Utc::now() + Duration::seconds(5));
        assert!(!token.is_valid());

        token.expiry = None;
        token.access_token.clear();
        assert!(!token.is_valid());
    }

    #[test]
    fn oauth_token_debug_redacts_secrets() {
        let token = OAuthToken {
            access_token: "super-secret-at".into(),
            refresh_token: "super-secret-rt".into(),
            ..Default::default()
        };
        let printed = format!("{token:?}");
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn access_item_omits_empty_fields() {
        let item = AccessItem::new("doc", "read");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({"resource": "doc", "action": "read"})
        );
        let granted: AccessItem =
            serde_json::from_value(json!({"resource": "doc", "action": "read", "ok": true}))
                .unwrap();
        assert!(granted.ok);
    }

    #[test]
    fn access_response_tolerates_null_data() {
        let resp: AccessResponse =
            serde_json::from_value(json!({"code": 403, "msg": "denied", "data": null})).unwrap();
        assert_eq!(resp.code, 403);
        assert!(resp.data.is_none());
    }

    #[test]
    fn password_request_debug_redacts_password() {
        let req = PasswordLoginRequest {
            username: "alice".into(),
            password: "pa55word".into(),
        };
        assert!(!format!("{req:?}").contains("pa55word"));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("bad_request", "missing code");
        assert_eq!(e.code, "bad_request");
        assert!(e.message.contains("missing code"));
    }
}
