use proptest::prelude::*;

use faceguard_risk::{Asn, RiskContext, RiskEngine};
use faceguard_types::{GeoInfo, VelocityCounters};

fn context() -> impl Strategy<Value = RiskContext> {
    (
        prop::option::of(prop_oneof![
            (any::<u8>(), any::<u8>(), any::<u8>(), any::<u8>())
                .prop_map(|(a, b, c, d)| format!("{a}.{b}.{c}.{d}")),
            "[a-z:.0-9]{0,16}",
        ]),
        prop::option::of(prop_oneof![
            any::<u64>().prop_map(Asn::Number),
            "[A-Za-z0-9]{0,8}".prop_map(Asn::Text),
        ]),
        prop::option::of(prop::sample::select(vec!["KP", "SY", "IR", "FR", "US", "kp"])),
        prop::option::of("[a-f0-9]{0,12}"),
        any::<bool>(),
        prop::option::of((any::<u32>(), any::<u32>(), any::<u32>())),
        prop::collection::vec("[a-z]{1,6}", 0..3),
    )
        .prop_map(|(ip, asn, country, fp, new_device, velocity, abuse_flags)| RiskContext {
            ip,
            asn,
            geo: country.map(|c| GeoInfo {
                country: Some(c.to_string()),
                ..GeoInfo::default()
            }),
            device_fingerprint: fp,
            new_device,
            velocity: velocity.map(|(logins, actions, rejections)| VelocityCounters {
                logins,
                actions,
                rejections,
            }),
            abuse_flags,
        })
}

proptest! {
    /// Every score is within [0, 100] and the decisions follow the thresholds.
    #[test]
    fn score_is_bounded_and_consistent(ctx in context()) {
        let r = RiskEngine::default().evaluate(&ctx);
        prop_assert!(r.risk_score <= 100);
        prop_assert_eq!(r.require_liveness, r.risk_score >= 70);
        prop_assert_eq!(r.block, r.risk_score >= 85);
        prop_assert!(!r.block || r.require_liveness);
    }

    /// Scoring is deterministic.
    #[test]
    fn evaluation_is_pure(ctx in context()) {
        let engine = RiskEngine::default();
        prop_assert_eq!(engine.evaluate(&ctx), engine.evaluate(&ctx));
    }

    /// Marking the device untrusted never lowers the score.
    #[test]
    fn new_device_never_lowers_score(ctx in context()) {
        let engine = RiskEngine::default();
        let trusted = engine.evaluate(&RiskContext { new_device: false, ..ctx.clone() });
        let untrusted = engine.evaluate(&RiskContext { new_device: true, ..ctx });
        prop_assert!(untrusted.risk_score >= trusted.risk_score);
    }
}
