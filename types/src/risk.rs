//! Output of the rule-based risk engine.

use serde::{Deserialize, Serialize};

/// A scored risk evaluation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Accumulated rule points, clamped to `[0, 100]`.
    pub risk_score: u32,
    /// Names of every rule that fired, in evaluation order.
    pub reasons: Vec<String>,
    /// Step-up: a liveness challenge must accompany the decision.
    pub require_liveness: bool,
    /// The request is refused regardless of match quality.
    pub block: bool,
}
