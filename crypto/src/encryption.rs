//! Authenticated encryption for data at rest.
//!
//! AES-256-GCM with a fresh random 96-bit nonce per seal. The sealed layout is
//! `nonce ‖ ciphertext ‖ tag`; the tag is checked on every open and a mismatch
//! is reported as [`CryptoError::Integrity`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::hash::sha256_multi;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

const KEY_DERIVATION_DOMAIN: &[u8] = b"faceguard-sealing-key";

/// A 256-bit sealing key. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; KEY_LEN]);

impl SealingKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a key from a configuration secret.
    ///
    /// A 64-character hex string is used as the raw key; any other non-empty
    /// string is stretched through SHA-256.
    pub fn from_secret(secret: &str) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::InvalidKey("sealing secret is empty".into()));
        }
        if secret.len() == KEY_LEN * 2 {
            if let Ok(raw) = hex::decode(secret) {
                let mut key = [0u8; KEY_LEN];
                key.copy_from_slice(&raw);
                return Ok(Self(key));
            }
        }
        Ok(Self(sha256_multi(&[KEY_DERIVATION_DOMAIN, secret.as_bytes()])))
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::InvalidKey(format!("AES key init failed: {e}")))
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SealingKey(..)")
    }
}

/// Encrypt and authenticate `plaintext`.
pub fn seal(key: &SealingKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);

    let ciphertext = key
        .cipher()?
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Verify and decrypt a blob produced by [`seal`].
pub fn open(key: &SealingKey, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Integrity(format!(
            "sealed blob too short: {} bytes",
            sealed.len()
        )));
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    key.cipher()?
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Integrity("authentication tag mismatch".into()))
}
