//! The risk engine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use tracing::debug;

use faceguard_types::{GeoInfo, RiskAssessment, VelocityCounters};

use crate::RiskPolicy;

/// An autonomous system number as clients send it: `14061` or `"as14061"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asn {
    Number(u64),
    Text(String),
}

impl Asn {
    /// Canonical `AS<n>` form. Text is upper-cased as-is.
    pub fn normalized(&self) -> String {
        match self {
            Asn::Number(n) => format!("AS{n}"),
            Asn::Text(s) => s.trim().to_ascii_uppercase(),
        }
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized())
    }
}

/// Everything known about a request at scoring time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskContext {
    pub ip: Option<String>,
    pub asn: Option<Asn>,
    pub geo: Option<GeoInfo>,
    pub device_fingerprint: Option<String>,
    /// The device is not among the user's trusted devices.
    pub new_device: bool,
    pub velocity: Option<VelocityCounters>,
    pub abuse_flags: Vec<String>,
}

/// Scores requests against a [`RiskPolicy`]. Pure and deterministic.
pub struct RiskEngine {
    policy: RiskPolicy,
    asns: HashSet<String>,
    countries: HashSet<String>,
}

impl RiskEngine {
    pub fn new(policy: RiskPolicy) -> Self {
        let asns = policy
            .high_risk_asns
            .iter()
            .map(|a| a.trim().to_ascii_uppercase())
            .collect();
        let countries = policy
            .sanctioned_countries
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .collect();
        Self {
            policy,
            asns,
            countries,
        }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn evaluate(&self, ctx: &RiskContext) -> RiskAssessment {
        let p = &self.policy;
        let mut score: u32 = 0;
        let mut reasons: Vec<String> = Vec::new();
        let mut fire = |points: u32, reason: &str| {
            score = score.saturating_add(points);
            reasons.push(reason.to_string());
        };

        if let Some((points, reason)) = ctx.ip.as_deref().and_then(|ip| self.score_ip(ip)) {
            fire(points, reason);
        }

        if let Some(asn) = &ctx.asn {
            if self.asns.contains(&asn.normalized()) {
                fire(p.high_risk_asn_points, "high_risk_asn");
            }
        }

        let country = ctx.geo.as_ref().and_then(|g| g.country.as_deref());
        if let Some(country) = country {
            if self.countries.contains(&country.trim().to_ascii_uppercase()) {
                fire(p.sanctioned_geo_points, "sanctioned_geo");
            }
        }

        if ctx.new_device {
            fire(p.untrusted_device_points, "untrusted_device");
        }

        if let Some(v) = &ctx.velocity {
            if v.logins > p.login_velocity_limit {
                fire(p.login_velocity_points, "login_velocity");
            }
            if v.actions > p.action_velocity_limit {
                fire(p.action_velocity_points, "action_velocity");
            }
            if v.rejections > p.rejection_limit {
                fire(p.rejection_points, "rejection_spike");
            }
        }

        if !ctx.abuse_flags.is_empty() {
            fire(p.abuse_history_points, "abuse_history");
        }

        if ctx.device_fingerprint.as_deref().map_or(true, str::is_empty) {
            fire(p.missing_device_points, "missing_device_fp");
        }

        let risk_score = score.min(100);
        RiskAssessment {
            risk_score,
            reasons,
            require_liveness: risk_score >= p.require_liveness_at,
            block: risk_score >= p.block_at,
        }
    }

    /// The first matching network-origin rule.
    fn score_ip(&self, raw: &str) -> Option<(u32, &'static str)> {
        let p = &self.policy;
        let ip = match raw.trim().parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => {
                debug!(ip = raw, "unparseable client address, not scored");
                return None;
            }
        };
        match ip {
            IpAddr::V4(v4) if v4.is_private() => Some((p.private_ip_points, "private_ip")),
            IpAddr::V4(v4) if v4.is_loopback() => Some((p.loopback_ip_points, "loopback_ip")),
            IpAddr::V4(v4) if p.high_risk_ranges.iter().any(|r| r.contains(v4)) => {
                Some((p.high_risk_range_points, "tor_or_hosting_range"))
            }
            IpAddr::V6(v6) if v6.is_loopback() => Some((p.loopback_ip_points, "loopback_ip")),
            _ => None,
        }
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new(RiskPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trusted() -> RiskContext {
        RiskContext {
            device_fingerprint: Some("dev-1".into()),
            ..RiskContext::default()
        }
    }

    fn with_ip(ip: &str) -> RiskContext {
        RiskContext {
            ip: Some(ip.into()),
            ..trusted()
        }
    }

    #[test]
    fn clean_request_scores_zero() {
        let r = RiskEngine::default().evaluate(&trusted());
        assert_eq!(r.risk_score, 0);
        assert!(r.reasons.is_empty());
        assert!(!r.require_liveness);
        assert!(!r.block);
    }

    #[test]
    fn ip_rules() {
        let engine = RiskEngine::default();
        let cases = [
            ("10.1.2.3", 5, Some("private_ip")),
            ("172.16.0.1", 5, Some("private_ip")),
            ("172.32.0.1", 0, None),
            ("192.168.1.1", 5, Some("private_ip")),
            ("127.0.0.1", 10, Some("loopback_ip")),
            ("::1", 10, Some("loopback_ip")),
            ("5.255.1.1", 25, Some("tor_or_hosting_range")),
            ("23.129.64.1", 25, Some("tor_or_hosting_range")),
            ("91.1.1.1", 25, Some("tor_or_hosting_range")),
            ("178.200.0.1", 25, Some("tor_or_hosting_range")),
            ("8.8.8.8", 0, None),
            ("not-an-ip", 0, None),
        ];
        for (ip, points, reason) in cases {
            let r = engine.evaluate(&with_ip(ip));
            assert_eq!(r.risk_score, points, "{ip}");
            assert_eq!(r.reasons.first().map(String::as_str), reason, "{ip}");
        }
    }

    #[test]
    fn asn_is_normalized() {
        let engine = RiskEngine::default();
        for asn in [Asn::Number(14061), Asn::Text("as9009".into())] {
            let r = engine.evaluate(&RiskContext {
                asn: Some(asn),
                ..trusted()
            });
            assert_eq!(r.risk_score, 25);
            assert_eq!(r.reasons, vec!["high_risk_asn"]);
        }
        let benign = engine.evaluate(&RiskContext {
            asn: Some(Asn::Number(15169)),
            ..trusted()
        });
        assert_eq!(benign.risk_score, 0);
    }

    #[test]
    fn asn_deserializes_from_number_or_string() {
        let n: Asn = serde_json::from_str("14061").unwrap();
        let s: Asn = serde_json::from_str("\"AS14061\"").unwrap();
        assert_eq!(n.normalized(), s.normalized());
    }

    #[test]
    fn sanctioned_geo() {
        let r = RiskEngine::default().evaluate(&RiskContext {
            geo: Some(GeoInfo {
                country: Some("KP".into()),
                ..GeoInfo::default()
            }),
            ..trusted()
        });
        assert_eq!(r.risk_score, 40);
        assert_eq!(r.reasons, vec!["sanctioned_geo"]);
    }

    #[test]
    fn velocity_thresholds_are_exclusive() {
        let engine = RiskEngine::default();
        let at_limit = engine.evaluate(&RiskContext {
            velocity: Some(VelocityCounters {
                logins: 5,
                actions: 50,
                rejections: 3,
            }),
            ..trusted()
        });
        assert_eq!(at_limit.risk_score, 0);

        let over = engine.evaluate(&RiskContext {
            velocity: Some(VelocityCounters {
                logins: 6,
                actions: 51,
                rejections: 4,
            }),
            ..trusted()
        });
        assert_eq!(over.risk_score, 55);
        assert_eq!(
            over.reasons,
            vec!["login_velocity", "action_velocity", "rejection_spike"]
        );
    }

    #[test]
    fn missing_fingerprint() {
        let r = RiskEngine::default().evaluate(&RiskContext {
            device_fingerprint: Some(String::new()),
            ..RiskContext::default()
        });
        assert_eq!(r.risk_score, 10);
        assert_eq!(r.reasons, vec!["missing_device_fp"]);
    }

    #[test]
    fn high_risk_combination_blocks() {
        // logins 20 + abuse 30 + asn 25 + new device 15 = 90
        let r = RiskEngine::default().evaluate(&RiskContext {
            asn: Some(Asn::Number(14061)),
            new_device: true,
            velocity: Some(VelocityCounters {
                logins: 10,
                ..VelocityCounters::default()
            }),
            abuse_flags: vec!["spam".into()],
            ..trusted()
        });
        assert_eq!(r.risk_score, 90);
        assert!(r.require_liveness);
        assert!(r.block);
    }

    #[test]
    fn step_up_band() {
        // asn 25 + new device 15 + logins 20 + missing fp 10 = 70
        let r = RiskEngine::default().evaluate(&RiskContext {
            asn: Some(Asn::Number(14061)),
            new_device: true,
            velocity: Some(VelocityCounters {
                logins: 6,
                ..VelocityCounters::default()
            }),
            ..RiskContext::default()
        });
        assert_eq!(r.risk_score, 70);
        assert!(r.require_liveness);
        assert!(!r.block);
    }

    #[test]
    fn score_is_clamped() {
        let r = RiskEngine::default().evaluate(&RiskContext {
            ip: Some("91.0.0.1".into()),
            asn: Some(Asn::Number(14061)),
            geo: Some(GeoInfo {
                country: Some("IR".into()),
                ..GeoInfo::default()
            }),
            new_device: true,
            velocity: Some(VelocityCounters {
                logins: 99,
                actions: 99,
                rejections: 99,
            }),
            abuse_flags: vec!["x".into()],
            device_fingerprint: None,
        });
        assert_eq!(r.risk_score, 100);
        assert_eq!(r.reasons.len(), 9);
    }

    #[test]
    fn custom_policy_changes_thresholds() {
        let engine = RiskEngine::new(RiskPolicy {
            block_at: 10,
            ..RiskPolicy::default()
        });
        let r = engine.evaluate(&RiskContext::default());
        assert_eq!(r.risk_score, 10);
        assert!(r.block);
    }
}
