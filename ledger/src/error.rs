use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("audit chain broken at entry {index}: {reason}")]
    ChainBroken { index: usize, reason: String },

    #[error("compaction grant rejected: {0}")]
    InvalidGrant(String),

    #[error("storage error: {0}")]
    Storage(#[from] faceguard_store::StoreError),
}
