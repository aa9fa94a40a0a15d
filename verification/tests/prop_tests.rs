use proptest::prelude::*;

use faceguard_types::{ActiveChallengeResult, PassiveSignals};
use faceguard_verification::{combine_scores, FusionWeights, LivenessEvaluator};

fn signal() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        Just(None),
        (-5.0f64..5.0).prop_map(Some),
        Just(Some(f64::NAN)),
        Just(Some(f64::INFINITY)),
    ]
}

proptest! {
    /// The passive score is always in [0, 1].
    #[test]
    fn passive_score_is_bounded(glare in signal(), moire in signal(), flatness in signal()) {
        let score = LivenessEvaluator::default()
            .evaluate_passive_signals(&PassiveSignals { glare, moire, flatness });
        prop_assert!((0.0..=1.0).contains(&score));
    }

    /// The combined score is always in [0, 1], whatever the weights.
    #[test]
    fn combined_score_is_bounded(
        cosine in -1.0f64..1.0,
        passive in 0.0f64..=1.0,
        blink in any::<bool>(),
        yaw in any::<bool>(),
        alpha in 0.0f64..3.0,
        beta in 0.0f64..3.0,
    ) {
        let evaluator = LivenessEvaluator::new(FusionWeights { alpha, beta });
        let active = evaluator.evaluate_active_challenge(&ActiveChallengeResult::new(blink, yaw));
        let combined = evaluator.combine_scores(cosine, passive, active);
        prop_assert!((0.0..=1.0).contains(&combined));
        prop_assert_eq!(combined, combine_scores(cosine, passive, active, FusionWeights { alpha, beta }));
    }

    /// More liveness evidence never lowers the combined score.
    #[test]
    fn combined_is_monotonic_in_liveness(cosine in 0.0f64..1.0, p1 in 0.0f64..=1.0, p2 in 0.0f64..=1.0) {
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let w = FusionWeights::default();
        prop_assert!(combine_scores(cosine, lo, 0.0, w) <= combine_scores(cosine, hi, 0.0, w));
    }
}
