use thiserror::Error;

use faceguard_crypto::CryptoError;
use faceguard_index::IndexError;
use faceguard_ledger::LedgerError;
use faceguard_moderation::{AlertStatus, ModerationError};
use faceguard_store::StoreError;
use faceguard_types::RiskAssessment;
use faceguard_verification::{Challenge, ChallengeError, ChallengeKind};
use faceguard_webhook::WebhookError;

/// An expected refusal, carried back to the caller with its context.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyRejection {
    /// Risk crossed the block threshold; a moderation case was opened.
    RiskBlock {
        risk: RiskAssessment,
        alert_id: String,
    },
    /// A liveness step-up must be completed first.
    LivenessRequired {
        challenge: Challenge,
        risk: Option<RiskAssessment>,
        action: Option<String>,
    },
    NoMatch {
        combined: f64,
        risk: RiskAssessment,
    },
    ChallengeCooldown {
        cooldown_ms: u64,
    },
    ChallengeLocked {
        cooldown_ms: u64,
    },
    ChallengeFailed {
        attempt: u32,
        order: [ChallengeKind; 2],
    },
    AlreadyResolved {
        alert_id: String,
        status: AlertStatus,
    },
}

impl PolicyRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PolicyRejection::RiskBlock { .. } => "risk_block",
            PolicyRejection::LivenessRequired { .. } => "liveness_required",
            PolicyRejection::NoMatch { .. } => "no_match",
            PolicyRejection::ChallengeCooldown { .. } => "challenge_cooldown",
            PolicyRejection::ChallengeLocked { .. } => "challenge_locked",
            PolicyRejection::ChallengeFailed { .. } => "challenge_failed",
            PolicyRejection::AlreadyResolved { .. } => "already_resolved",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected before any side effect.
    #[error("invalid request: {0}")]
    Validation(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("rejected by policy: {}", .0.code())]
    Policy(PolicyRejection),

    /// Stored data failed authentication or the audit chain is broken.
    #[error("integrity failure: {0}")]
    Integrity(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn policy(&self) -> Option<&PolicyRejection> {
        match self {
            ServiceError::Policy(p) => Some(p),
            _ => None,
        }
    }
}

impl From<PolicyRejection> for ServiceError {
    fn from(p: PolicyRejection) -> Self {
        ServiceError::Policy(p)
    }
}

impl From<CryptoError> for ServiceError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidEmbedding { .. }
            | CryptoError::NonFiniteEmbedding(_)
            | CryptoError::DegenerateEmbedding => ServiceError::Validation("invalid_embedding"),
            CryptoError::MissingSeed => ServiceError::Validation("missing_user_seed"),
            CryptoError::Integrity(reason) => ServiceError::Integrity(reason),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Integrity(reason) => ServiceError::Integrity(reason),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<IndexError> for ServiceError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::Integrity(reason) => ServiceError::Integrity(reason),
            IndexError::Store(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ServiceError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ChainBroken { .. } => ServiceError::Integrity(e.to_string()),
            LedgerError::InvalidGrant(_) => ServiceError::Validation("invalid_grant"),
            LedgerError::Storage(e) => e.into(),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<WebhookError> for ServiceError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Store(e) => e.into(),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<ModerationError> for ServiceError {
    fn from(e: ModerationError) -> Self {
        match e {
            ModerationError::NotFound(_) => ServiceError::NotFound("not_found"),
            ModerationError::AlreadyResolved { id, status } => {
                PolicyRejection::AlreadyResolved {
                    alert_id: id,
                    status,
                }
                .into()
            }
            ModerationError::InvalidAction(_) => ServiceError::Validation("invalid_payload"),
            ModerationError::Store(e) => e.into(),
            ModerationError::Audit(e) => e.into(),
            ModerationError::Webhook(e) => e.into(),
        }
    }
}

impl From<ChallengeError> for ServiceError {
    fn from(e: ChallengeError) -> Self {
        match e {
            ChallengeError::NotFound(_) => ServiceError::NotFound("challenge_not_found"),
            ChallengeError::Cooldown { remaining_ms } => PolicyRejection::ChallengeCooldown {
                cooldown_ms: remaining_ms,
            }
            .into(),
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_survives_every_layer() {
        let from_store: ServiceError = StoreError::Integrity("tag".into()).into();
        let from_index: ServiceError = IndexError::Integrity("tag".into()).into();
        let from_ledger: ServiceError = LedgerError::ChainBroken {
            index: 3,
            reason: "hash".into(),
        }
        .into();
        let from_moderation: ServiceError =
            ModerationError::Store(StoreError::Integrity("tag".into())).into();
        for e in [from_store, from_index, from_ledger, from_moderation] {
            assert!(matches!(e, ServiceError::Integrity(_)), "{e:?}");
        }
    }

    #[test]
    fn biohash_input_errors_are_validation() {
        let e: ServiceError = CryptoError::InvalidEmbedding {
            expected: 512,
            got: 3,
        }
        .into();
        assert!(matches!(e, ServiceError::Validation("invalid_embedding")));
        let e: ServiceError = CryptoError::DegenerateEmbedding.into();
        assert!(matches!(e, ServiceError::Validation("invalid_embedding")));
        let e: ServiceError = CryptoError::MissingSeed.into();
        assert!(matches!(e, ServiceError::Validation("missing_user_seed")));
    }

    #[test]
    fn cooldown_keeps_remaining_time() {
        let e: ServiceError = ChallengeError::Cooldown { remaining_ms: 1234 }.into();
        assert_eq!(
            e.policy(),
            Some(&PolicyRejection::ChallengeCooldown { cooldown_ms: 1234 })
        );
        assert_eq!(e.policy().map(PolicyRejection::code), Some("challenge_cooldown"));
    }
}
