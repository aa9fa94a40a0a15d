//! Liveness scoring and score fusion.

use faceguard_types::{ActiveChallengeResult, PassiveSignals};
use serde::{Deserialize, Serialize};

/// Active score at or above which a challenge counts as passed.
pub const ACTIVE_PASS_SCORE: f64 = 0.8;

/// Share of the liveness term taken by the passive score; the rest is active.
const PASSIVE_SHARE: f64 = 0.6;
const ACTIVE_SHARE: f64 = 0.4;

/// Weights of the identity match (`alpha`) and liveness evidence (`beta`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            beta: 0.3,
        }
    }
}

/// Reduces liveness evidence to scores in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LivenessEvaluator {
    weights: FusionWeights,
}

impl LivenessEvaluator {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Mean of `1 - s` over the three anomaly signals.
    ///
    /// Missing or non-finite signals count as zero anomaly.
    pub fn evaluate_passive_signals(&self, signals: &PassiveSignals) -> f64 {
        let inverted = |s: Option<f64>| 1.0 - unit(s.unwrap_or(0.0));
        let mean = (inverted(signals.glare) + inverted(signals.moire) + inverted(signals.flatness))
            / 3.0;
        unit(mean)
    }

    /// Fraction of the requested actions the user performed.
    pub fn evaluate_active_challenge(&self, result: &ActiveChallengeResult) -> f64 {
        (f64::from(u8::from(result.blink)) + f64::from(u8::from(result.yaw))) / 2.0
    }

    pub fn combine_scores(&self, cosine: f64, passive: f64, active: f64) -> f64 {
        combine_scores(cosine, passive, active, self.weights)
    }
}

/// `clamp(alpha * cosine + beta * (0.6 * passive + 0.4 * active), 0, 1)`.
pub fn combine_scores(cosine: f64, passive: f64, active: f64, weights: FusionWeights) -> f64 {
    let liveness = passive * PASSIVE_SHARE + active * ACTIVE_SHARE;
    unit(weights.alpha * cosine + weights.beta * liveness)
}

/// Clamp into `[0, 1]`; NaN maps to 0.
fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> LivenessEvaluator {
        LivenessEvaluator::default()
    }

    #[test]
    fn clean_capture_scores_one() {
        assert_eq!(
            evaluator().evaluate_passive_signals(&PassiveSignals::default()),
            1.0
        );
    }

    #[test]
    fn passive_signals_are_clamped() {
        let signals = PassiveSignals::new(5.0, -3.0, 0.5);
        // (0 + 1 + 0.5) / 3
        let score = evaluator().evaluate_passive_signals(&signals);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn nan_signal_counts_as_clean() {
        let signals = PassiveSignals {
            glare: Some(f64::NAN),
            moire: None,
            flatness: Some(1.0),
        };
        let score = evaluator().evaluate_passive_signals(&signals);
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn active_score_counts_actions() {
        let e = evaluator();
        assert_eq!(e.evaluate_active_challenge(&ActiveChallengeResult::new(false, false)), 0.0);
        assert_eq!(e.evaluate_active_challenge(&ActiveChallengeResult::new(true, false)), 0.5);
        assert_eq!(e.evaluate_active_challenge(&ActiveChallengeResult::new(true, true)), 1.0);
    }

    #[test]
    fn combine_uses_default_weights() {
        // 0.7 * 1.0 + 0.3 * (0.6 * 0.95 + 0.4 * 1.0) = 0.991
        let combined = evaluator().combine_scores(1.0, 0.95, 1.0);
        assert!((combined - 0.991).abs() < 1e-9);
    }

    #[test]
    fn combine_is_clamped() {
        let heavy = FusionWeights { alpha: 2.0, beta: 2.0 };
        assert_eq!(combine_scores(1.0, 1.0, 1.0, heavy), 1.0);
        assert_eq!(combine_scores(-1.0, 0.0, 0.0, FusionWeights::default()), 0.0);
    }
}
