//! AES-256-GCM document codec.

use faceguard_crypto::{open, seal, CryptoError, SealingKey};
use faceguard_store::{DocumentCodec, StoreError};

/// Seals documents with a configured key. Any authentication failure on
/// decode is reported as [`StoreError::Integrity`].
pub struct SealedCodec {
    key: SealingKey,
}

impl SealedCodec {
    pub fn new(key: SealingKey) -> Self {
        Self { key }
    }
}

impl DocumentCodec for SealedCodec {
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError> {
        seal(&self.key, plain).map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, StoreError> {
        open(&self.key, stored).map_err(|e| match e {
            CryptoError::Integrity(reason) => StoreError::Integrity(reason),
            other => StoreError::Backend(other.to_string()),
        })
    }
}
