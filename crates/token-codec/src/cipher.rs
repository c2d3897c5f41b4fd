//! Symmetric cipher adapter used by the token pipeline.
//!
//! The pipeline only relies on the [`CipherAdapter`] contract:
//!
//! - `encrypt` returns the ciphertext, or an **empty** vector on failure.
//! - `decrypt` always returns *some* bytes. It does not authenticate its
//!   input; a wrong secret yields garbage rather than an error.
//!
//! # Default algorithm
//!
//! [`AesEcb`] is what previously issued tokens were produced with, so it is
//! fixed by compatibility rather than chosen:
//!
//! ```text
//! key        = secret zero-padded to 16 / 24 / 32 bytes (truncated past 32)
//! ciphertext = AES-ECB(key, PKCS7(plaintext))
//! ```
//!
//! ECB leaks equal plaintext blocks and nothing here detects tampering. Moving
//! to an AEAD would change the token format and invalidate every issued token.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256};

/// AES block length in bytes.
pub const BLOCK_LEN: usize = 16;

/// Accepted AES key lengths, smallest first.
const KEY_LENS: [usize; 3] = [16, 24, 32];

/// Encrypt/decrypt contract consumed by [`PipelineConfig`](crate::PipelineConfig).
pub trait CipherAdapter: Send + Sync + std::fmt::Debug {
    /// Encrypt `plaintext` with `secret`. An empty result signals failure.
    fn encrypt(&self, plaintext: &[u8], secret: &[u8]) -> Vec<u8>;

    /// Decrypt `ciphertext` with `secret`, best effort and without authentication.
    fn decrypt(&self, ciphertext: &[u8], secret: &[u8]) -> Vec<u8>;
}

/// AES in ECB mode with PKCS#7 padding and a zero-padded key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesEcb;

impl CipherAdapter for AesEcb {
    fn encrypt(&self, plaintext: &[u8], secret: &[u8]) -> Vec<u8> {
        let Some(cipher) = BlockCipher::from_secret(secret) else {
            return Vec::new();
        };
        let mut buf = pkcs7_pad(plaintext);
        cipher.encrypt_blocks(&mut buf);
        buf
    }

    fn decrypt(&self, ciphertext: &[u8], secret: &[u8]) -> Vec<u8> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Vec::new();
        }
        let Some(cipher) = BlockCipher::from_secret(secret) else {
            return Vec::new();
        };
        let mut buf = ciphertext.to_vec();
        cipher.decrypt_blocks(&mut buf);
        // Bad padding hands back the raw blocks; the caller's parser rejects them.
        if let Some(pad) = pkcs7_padding_len(&buf) {
            buf.truncate(buf.len() - pad);
        }
        buf
    }
}

/// AES keyed with a secret, sized by the derived key length.
enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    fn from_secret(secret: &[u8]) -> Option<Self> {
        let mut key = derive_key(secret)?;
        let cipher = match key.len() {
            16 => Aes128::new_from_slice(&key).ok().map(Self::Aes128),
            24 => Aes192::new_from_slice(&key).ok().map(Self::Aes192),
            _ => Aes256::new_from_slice(&key).ok().map(Self::Aes256),
        };
        key.iter_mut().for_each(|b| *b = 0);
        cipher
    }

    fn encrypt_blocks(&self, buf: &mut [u8]) {
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            match self {
                Self::Aes128(c) => c.encrypt_block(block),
                Self::Aes192(c) => c.encrypt_block(block),
                Self::Aes256(c) => c.encrypt_block(block),
            }
        }
    }

    fn decrypt_blocks(&self, buf: &mut [u8]) {
        for chunk in buf.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            match self {
                Self::Aes128(c) => c.decrypt_block(block),
                Self::Aes192(c) => c.decrypt_block(block),
                Self::Aes256(c) => c.decrypt_block(block),
            }
        }
    }
}

/// Zero-pad `secret` up to the smallest AES key length that holds it.
///
/// Returns `None` for an empty secret.
fn derive_key(secret: &[u8]) -> Option<Vec<u8>> {
    if secret.is_empty() {
        return None;
    }
    let len = KEY_LENS
        .into_iter()
        .find(|&n| secret.len() <= n)
        .unwrap_or(KEY_LENS[KEY_LENS.len() - 1]);
    let mut key = vec![0u8; len];
    let take = secret.len().min(len);
    key[..take].copy_from_slice(&secret[..take]);
    Some(key)
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_LEN - data.len() % BLOCK_LEN;
    let mut buf = Vec::with_capacity(data.len() + pad);
    buf.extend_from_slice(data);
    buf.resize(data.len() + pad, pad as u8);
    buf
}

/// Length of a valid PKCS#7 trailer, or `None` if the trailer is malformed.
fn pkcs7_padding_len(buf: &[u8]) -> Option<usize> {
    let pad = *buf.last()? as usize;
    if pad == 0 || pad > BLOCK_LEN || pad > buf.len() {
        return None;
    }
    buf[buf.len() - pad..]
        .iter()
        .all(|&b| b as usize == pad)
        .then_some(pad)
}
