//! Reversible value ↔ opaque token encoding for `user-sso`.
//!
//! A [`PipelineConfig`] turns any `serde` value into a URL-safe string that can
//! be carried in a header or cookie, and back again:
//!
//! ```
//! use std::collections::BTreeMap;
//! use serde::{Deserialize, Serialize};
//! use token_codec::{PipelineConfig, PipelineOption};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Session {
//!     name: String,
//!     #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
//!     md: BTreeMap<String, String>,
//! }
//!
//! let cfg = PipelineConfig::new("biomind1024", [PipelineOption::Compression(true)]).unwrap();
//! let session = Session { name: "aaa".into(), md: BTreeMap::new() };
//! let token = cfg.encode(&session).unwrap();
//! assert_eq!(cfg.decode::<Session>(&token).unwrap(), session);
//! ```
//!
//! # Security
//!
//! Tokens are encrypted but **not authenticated**. A wrong secret or a tampered
//! token is only noticed when the decrypted bytes fail to parse.

pub mod cipher;
pub mod compress;
pub mod error;
pub mod pipeline;
pub mod transport;

pub use cipher::{AesEcb, CipherAdapter};
pub use compress::{Compressor, Gzip};
pub use error::{ConfigError, DecodeError, EncodeError};
pub use pipeline::{PipelineBuilder, PipelineConfig, PipelineOption};
