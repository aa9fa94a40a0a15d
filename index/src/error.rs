use faceguard_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    /// The sealed index failed authentication. Fatal for the operation.
    #[error("vector index integrity failure: {0}")]
    Integrity(String),

    #[error("vector index storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for IndexError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Integrity(reason) => IndexError::Integrity(reason),
            other => IndexError::Store(other),
        }
    }
}
