//! Error types for pipeline construction, encoding and decoding.

use thiserror::Error;

/// Errors raised while building a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The secret is empty; no key can be derived from it.
    #[error("token secret must not be empty")]
    EmptySecret,
}

/// Errors raised by [`PipelineConfig::encode`](crate::PipelineConfig::encode).
///
/// Each variant names the stage that aborted the pipeline.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The value serialises to JSON `null` (`None`, `()`), so there is nothing to encode.
    #[error("value to encode is nil")]
    NilValue,

    /// `serde_json` rejected the value.
    #[error("failed to serialise value: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The cipher adapter signalled failure by returning no ciphertext.
    #[error("cipher adapter produced no ciphertext")]
    Encryption,

    /// The compressor failed to produce a complete stream.
    #[error("failed to compress ciphertext: {0}")]
    Compression(#[source] std::io::Error),
}

/// Errors raised by [`PipelineConfig::decode`](crate::PipelineConfig::decode).
///
/// Decryption has no variant: the cipher adapter never fails loudly, so a wrong
/// secret, a compression-flag mismatch and corrupted ciphertext all surface as
/// [`DecodeError::Deserialization`] (or, rarely, as a value that parses but is
/// wrong). The token carries no integrity check that could tell them apart.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The token is not valid unpadded URL-safe base64.
    #[error("token is not valid base64url: {0}")]
    Transport(#[source] base64::DecodeError),

    /// The compressed stream is truncated, corrupt or over the size limit.
    #[error("failed to decompress token: {0}")]
    Decompression(#[source] std::io::Error),

    /// The decrypted bytes do not parse into the requested type.
    #[error("failed to deserialise token payload: {0}")]
    Deserialization(#[source] serde_json::Error),
}
