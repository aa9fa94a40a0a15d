//! Byte-level transforms applied to documents at rest.

use crate::StoreError;

pub trait DocumentCodec: Send + Sync {
    /// Transform serialized document bytes before they are written.
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Reverse [`encode`](Self::encode) on bytes read back from storage.
    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, StoreError>;
}

/// Stores documents as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainCodec;

impl DocumentCodec for PlainCodec {
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(plain.to_vec())
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(stored.to_vec())
    }
}
