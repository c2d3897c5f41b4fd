//! [`PipelineConfig`]: the immutable encode/decode configuration.
//!
//! ```text
//! encode: value ─serde_json─▶ bytes ─encrypt─▶ ciphertext ─[gzip]─▶ bytes ─base64url─▶ token
//! decode: token ─base64url─▶ bytes ─[gunzip]─▶ ciphertext ─decrypt─▶ bytes ─serde_json─▶ value
//! ```
//!
//! Whether the gzip stage runs is agreed out of band: nothing in the token
//! says so, and a config with the wrong flag fails (or misparses) on decode.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cipher::{AesEcb, CipherAdapter};
use crate::compress::{Compressor, Gzip};
use crate::error::{ConfigError, DecodeError, EncodeError};
use crate::transport;

/// Construction-time option for [`PipelineConfig::new`].
///
/// Options are applied in order; a later option overrides an earlier one
/// touching the same setting.
#[derive(Debug, Clone)]
pub enum PipelineOption {
    /// Enable or disable the gzip stage. Disabled by default.
    Compression(bool),
    /// Reject compressed tokens that inflate past this many bytes.
    DecompressionLimit(usize),
    /// Replace the default [`AesEcb`] cipher adapter.
    Cipher(Arc<dyn CipherAdapter>),
    /// Replace the default [`Gzip`] compressor.
    Compressor(Arc<dyn Compressor>),
}

/// Secret bytes, zeroed on drop and never printed.
struct Secret(Vec<u8>);

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

#[derive(Debug)]
struct Inner {
    secret: Secret,
    compression: bool,
    decompression_limit: Option<usize>,
    cipher: Arc<dyn CipherAdapter>,
    compressor: Arc<dyn Compressor>,
}

/// Immutable token pipeline configuration.
///
/// Cloning is cheap and clones share the same secret. There are no setters;
/// a different secret or flag means a new config, and tokens issued under the
/// old one will no longer decode.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    inner: Arc<Inner>,
}

impl PipelineConfig {
    /// Build a config from a secret and options applied in order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySecret`] if `secret` is empty.
    pub fn new(
        secret: impl Into<Vec<u8>>,
        options: impl IntoIterator<Item = PipelineOption>,
    ) -> Result<Self, ConfigError> {
        let secret = Secret(secret.into());
        if secret.0.is_empty() {
            return Err(ConfigError::EmptySecret);
        }

        let mut inner = Inner {
            secret,
            compression: false,
            decompression_limit: None,
            cipher: Arc::new(AesEcb),
            compressor: Arc::new(Gzip),
        };
        for option in options {
            match option {
                PipelineOption::Compression(enabled) => inner.compression = enabled,
                PipelineOption::DecompressionLimit(limit) => inner.decompression_limit = Some(limit),
                PipelineOption::Cipher(cipher) => inner.cipher = cipher,
                PipelineOption::Compressor(compressor) => inner.compressor = compressor,
            }
        }
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Start a [`PipelineBuilder`] for `secret`.
    pub fn builder(secret: impl Into<Vec<u8>>) -> PipelineBuilder {
        PipelineBuilder {
            secret: secret.into(),
            options: Vec::new(),
        }
    }

    /// Whether the gzip stage runs.
    pub fn compression_enabled(&self) -> bool {
        self.inner.compression
    }

    /// Maximum decompressed size accepted by [`decode`](Self::decode), if any.
    pub fn decompression_limit(&self) -> Option<usize> {
        self.inner.decompression_limit
    }

    /// Encode `value` into an opaque, URL-safe token.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::NilValue`] if `value` serialises to `null`.
    /// - [`EncodeError::Serialization`] if `serde_json` rejects `value`.
    /// - [`EncodeError::Encryption`] if the cipher adapter returns nothing.
    /// - [`EncodeError::Compression`] if the compressor fails.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, EncodeError> {
        let json = serde_json::to_vec(value).map_err(|e| {
            debug!(stage = "serialize", error = %e, "token encode failed");
            EncodeError::Serialization(e)
        })?;
        if json == b"null" {
            debug!(stage = "serialize", "token encode rejected nil value");
            return Err(EncodeError::NilValue);
        }

        let encrypted = self.inner.cipher.encrypt(&json, &self.inner.secret.0);
        if encrypted.is_empty() {
            debug!(stage = "encrypt", "token encode failed");
            return Err(EncodeError::Encryption);
        }

        let body = if self.inner.compression {
            self.inner.compressor.compress(&encrypted).map_err(|e| {
                debug!(stage = "compress", error = %e, "token encode failed");
                EncodeError::Compression(e)
            })?
        } else {
            encrypted
        };

        Ok(transport::encode(&body))
    }

    /// Decode a token produced by [`encode`](Self::encode) under the same
    /// secret and compression flag.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Transport`] for malformed base64url.
    /// - [`DecodeError::Decompression`] for a truncated, corrupt or oversized stream.
    /// - [`DecodeError::Deserialization`] when the decrypted bytes do not parse
    ///   as `T`. This is also what a wrong secret or flag mismatch looks like.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, DecodeError> {
        let data = transport::decode(token).map_err(|e| {
            debug!(stage = "transport", error = %e, "token decode failed");
            DecodeError::Transport(e)
        })?;

        let ciphertext = if self.inner.compression {
            self.inner
                .compressor
                .decompress(&data, self.inner.decompression_limit)
                .map_err(|e| {
                    debug!(stage = "decompress", error = %e, "token decode failed");
                    DecodeError::Decompression(e)
                })?
        } else {
            data
        };

        let plaintext = self.inner.cipher.decrypt(&ciphertext, &self.inner.secret.0);
        serde_json::from_slice(&plaintext).map_err(|e| {
            debug!(stage = "deserialize", error = %e, "token decode failed");
            DecodeError::Deserialization(e)
        })
    }
}

/// Chained alternative to passing a [`PipelineOption`] list.
pub struct PipelineBuilder {
    secret: Vec<u8>,
    options: Vec<PipelineOption>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("secret", &"[REDACTED]")
            .field("options", &self.options)
            .finish()
    }
}

impl PipelineBuilder {
    /// See [`PipelineOption::Compression`].
    pub fn compression(mut self, enabled: bool) -> Self {
        self.options.push(PipelineOption::Compression(enabled));
        self
    }

    /// See [`PipelineOption::DecompressionLimit`].
    pub fn decompression_limit(mut self, limit: usize) -> Self {
        self.options.push(PipelineOption::DecompressionLimit(limit));
        self
    }

    /// See [`PipelineOption::Cipher`].
    pub fn cipher(mut self, cipher: Arc<dyn CipherAdapter>) -> Self {
        self.options.push(PipelineOption::Cipher(cipher));
        self
    }

    /// See [`PipelineOption::Compressor`].
    pub fn compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.options.push(PipelineOption::Compressor(compressor));
        self
    }

    /// Build the [`PipelineConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptySecret`] if the secret is empty.
    pub fn build(mut self) -> Result<PipelineConfig, ConfigError> {
        let secret = std::mem::take(&mut self.secret);
        let options = std::mem::take(&mut self.options);
        PipelineConfig::new(secret, options)
    }
}

impl Drop for PipelineBuilder {
    fn drop(&mut self) {
        self.secret.iter_mut().for_each(|b| *b = 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;

    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        md: BTreeMap<String, String>,
    }

    fn session() -> Session {
        Session {
            user: "alice".into(),
            md: BTreeMap::from([("role".into(), "admin".into())]),
        }
    }

    /// Cipher adapter that always reports failure.
    #[derive(Debug)]
    struct FailingCipher;

    impl CipherAdapter for FailingCipher {
        fn encrypt(&self, _: &[u8], _: &[u8]) -> Vec<u8> {
            Vec::new()
        }
        fn decrypt(&self, ciphertext: &[u8], _: &[u8]) -> Vec<u8> {
            ciphertext.to_vec()
        }
    }

    #[derive(Debug)]
    struct FailingCompressor;

    impl Compressor for FailingCompressor {
        fn compress(&self, _: &[u8]) -> io::Result<Vec<u8>> {
            Err(io::Error::other("stream closed"))
        }
        fn decompress(&self, _: &[u8], _: Option<usize>) -> io::Result<Vec<u8>> {
            Err(io::Error::other("stream closed"))
        }
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(matches!(
            PipelineConfig::new(Vec::new(), []),
            Err(ConfigError::EmptySecret)
        ));
        assert!(PipelineConfig::builder("").build().is_err());
    }

    #[test]
    fn compression_defaults_off() {
        let cfg = PipelineConfig::new("secret", []).unwrap();
        assert!(!cfg.compression_enabled());
        assert_eq!(cfg.decompression_limit(), None);
    }

    #[test]
    fn later_options_override_earlier_ones() {
        let cfg = PipelineConfig::new(
            "secret",
            [
                PipelineOption::Compression(true),
                PipelineOption::Compression(false),
                PipelineOption::DecompressionLimit(10),
                PipelineOption::DecompressionLimit(20),
            ],
        )
        .unwrap();
        assert!(!cfg.compression_enabled());
        assert_eq!(cfg.decompression_limit(), Some(20));

        let built = PipelineConfig::builder("secret")
            .compression(false)
            .compression(true)
            .build()
            .unwrap();
        assert!(built.compression_enabled());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = PipelineConfig::new("hunter2-very-secret", []).unwrap();
        let printed = format!("{cfg:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn round_trip_both_modes() {
        for compression in [false, true] {
            let cfg = PipelineConfig::builder("secret")
                .compression(compression)
                .build()
                .unwrap();
            let token = cfg.encode(&session()).unwrap();
            let decoded: Session = cfg.decode(&token).unwrap();
            assert_eq!(decoded, session());
        }
    }

    #[test]
    fn nil_values_rejected() {
        let cfg = PipelineConfig::new("secret", []).unwrap();
        assert!(matches!(cfg.encode(&None::<Session>), Err(EncodeError::NilValue)));
        assert!(matches!(cfg.encode(&()), Err(EncodeError::NilValue)));
    }

    #[test]
    fn serialization_failure_surfaces() {
        // JSON object keys must be strings.
        let bad: BTreeMap<Vec<u8>, u8> = BTreeMap::from([(vec![1u8], 1u8)]);
        let cfg = PipelineConfig::new("secret", []).unwrap();
        assert!(matches!(cfg.encode(&bad), Err(EncodeError::Serialization(_))));
    }

    #[test]
    fn empty_cipher_output_is_encryption_error() {
        let cfg = PipelineConfig::builder("secret")
            .cipher(Arc::new(FailingCipher))
            .build()
            .unwrap();
        assert!(matches!(cfg.encode(&session()), Err(EncodeError::Encryption)));
    }

    #[test]
    fn compressor_failure_is_fatal() {
        let cfg = PipelineConfig::builder("secret")
            .compression(true)
            .compressor(Arc::new(FailingCompressor))
            .build()
            .unwrap();
        assert!(matches!(cfg.encode(&session()), Err(EncodeError::Compression(_))));
        assert!(matches!(
            cfg.decode::<Session>("AAAA"),
            Err(DecodeError::Decompression(_))
        ));
    }

    #[test]
    fn compressor_is_skipped_when_disabled() {
        let cfg = PipelineConfig::builder("secret")
            .compressor(Arc::new(FailingCompressor))
            .build()
            .unwrap();
        let token = cfg.encode(&session()).unwrap();
        assert_eq!(cfg.decode::<Session>(&token).unwrap(), session());
    }

    #[test]
    fn decompression_limit_applies() {
        let cfg = PipelineConfig::builder("secret")
            .compression(true)
            .decompression_limit(16)
            .build()
            .unwrap();
        let token = cfg.encode(&session()).unwrap();
        assert!(matches!(
            cfg.decode::<Session>(&token),
            Err(DecodeError::Decompression(_))
        ));
    }

    #[test]
    fn clones_share_configuration() {
        let cfg = PipelineConfig::builder("secret").compression(true).build().unwrap();
        let clone = cfg.clone();
        let token = cfg.encode(&session()).unwrap();
        assert_eq!(clone.decode::<Session>(&token).unwrap(), session());
    }

    #[test]
    fn concurrent_use_from_threads() {
        let cfg = PipelineConfig::builder("secret").compression(true).build().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cfg = cfg.clone();
                std::thread::spawn(move || {
                    let value = Session {
                        user: format!("user-{i}"),
                        md: BTreeMap::new(),
                    };
                    let token = cfg.encode(&value).unwrap();
                    let decoded: Session = cfg.decode(&token).unwrap();
                    assert_eq!(decoded, value);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
