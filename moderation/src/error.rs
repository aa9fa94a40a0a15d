use thiserror::Error;

use crate::AlertStatus;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("moderation alert {0} not found")]
    NotFound(String),

    #[error("moderation alert {id} is already {status}")]
    AlreadyResolved { id: String, status: AlertStatus },

    #[error("unknown moderation action {0:?}")]
    InvalidAction(String),

    #[error("moderation storage error: {0}")]
    Store(#[from] faceguard_store::StoreError),

    #[error("audit error: {0}")]
    Audit(#[from] faceguard_ledger::LedgerError),

    #[error("webhook error: {0}")]
    Webhook(#[from] faceguard_webhook::WebhookError),
}
