use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook log storage error: {0}")]
    Store(#[from] faceguard_store::StoreError),

    #[error("webhook payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("mTLS identity could not be loaded: {0}")]
    Identity(String),

    #[error("webhook HTTP client setup failed: {0}")]
    Client(String),
}
