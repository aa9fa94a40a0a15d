use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("embedding must have {expected} dimensions, got {got}")]
    InvalidEmbedding { expected: usize, got: usize },

    #[error("embedding contains a non-finite component at index {0}")]
    NonFiniteEmbedding(usize),

    #[error("embedding has zero length")]
    DegenerateEmbedding,

    #[error("biohash seed is required")]
    MissingSeed,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("integrity check failed: {0}")]
    Integrity(String),
}
