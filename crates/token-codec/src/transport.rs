//! Transport stage: URL-safe base64 without padding.
//!
//! Output never contains `+`, `/` or `=`, so tokens can travel in headers,
//! cookies and query strings unescaped. Decoding is strict: standard-alphabet
//! characters, padding and impossible lengths are rejected.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// Encode bytes as an unpadded base64url string.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an unpadded base64url string.
pub fn decode(token: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(token)
}
