//! Service parameters: matching thresholds, fusion weights and challenge policy.
//!
//! Every field is tunable per deployment through the daemon configuration.

use serde::{Deserialize, Serialize};

/// Tenant used when a request does not name one.
pub const DEFAULT_TENANT: &str = "default";

/// Region used when a request does not name one.
pub const DEFAULT_REGION: &str = "global";

/// All parameters that shape authentication decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceParams {
    // ── Matching ─────────────────────────────────────────────────────────
    /// Minimum cosine similarity between the probe and the best stored
    /// template for a 1:1 verification to count as a match.
    pub similarity_threshold: f64,

    /// Maximum number of candidates returned by 1:N identification.
    pub identification_limit: usize,

    // ── Score fusion ─────────────────────────────────────────────────────
    /// Weight of the identity match in the combined score.
    pub alpha: f64,

    /// Weight of the liveness evidence in the combined score.
    pub beta: f64,

    /// Minimum combined score for a verification to succeed.
    pub liveness_threshold: f64,

    // ── Active challenges ────────────────────────────────────────────────
    /// Cooldown applied after a challenge passes or exhausts its attempts.
    /// Default: 3 minutes.
    pub challenge_cooldown_ms: u64,

    /// Failed rechecks allowed before a challenge locks.
    pub challenge_max_attempts: u32,

    // ── Compliance ───────────────────────────────────────────────────────
    /// Consent text version recorded with new enrollments.
    pub consent_version: String,

    /// Days biometric data is retained before the purge job removes it.
    pub retention_days: u64,
}

impl Default for FaceParams {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.78,
            identification_limit: 5,
            alpha: 0.7,
            beta: 0.3,
            liveness_threshold: 0.72,
            challenge_cooldown_ms: 180_000,
            challenge_max_attempts: 3,
            consent_version: "2024-07".to_string(),
            retention_days: 365,
        }
    }
}
