use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChallengeError {
    #[error("challenge {0} not found")]
    NotFound(String),

    /// The challenge is locked; no attempt was consumed.
    #[error("challenge is cooling down for another {remaining_ms}ms")]
    Cooldown { remaining_ms: u64 },
}
