//! Risk policy tables.
//!
//! Loaded from the `[risk]` section of the daemon configuration. Any field
//! left out keeps its default.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::Cidr;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    // ── Network origin (first matching rule only) ───────────────────────
    pub private_ip_points: u32,
    pub loopback_ip_points: u32,
    /// Anonymizer and bulk-hosting ranges.
    pub high_risk_ranges: Vec<Cidr>,
    pub high_risk_range_points: u32,

    /// Autonomous systems in `AS<number>` form.
    pub high_risk_asns: Vec<String>,
    pub high_risk_asn_points: u32,

    /// ISO 3166-1 alpha-2 country codes.
    pub sanctioned_countries: Vec<String>,
    pub sanctioned_geo_points: u32,

    // ── Device ───────────────────────────────────────────────────────────
    pub untrusted_device_points: u32,
    pub missing_device_points: u32,

    // ── Velocity (a rule fires when the counter exceeds its limit) ──────
    pub login_velocity_limit: u32,
    pub login_velocity_points: u32,
    pub action_velocity_limit: u32,
    pub action_velocity_points: u32,
    pub rejection_limit: u32,
    pub rejection_points: u32,

    pub abuse_history_points: u32,

    // ── Decisions ────────────────────────────────────────────────────────
    /// Score at or above which a liveness step-up is required.
    pub require_liveness_at: u32,
    /// Score at or above which the request is refused.
    pub block_at: u32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            private_ip_points: 5,
            loopback_ip_points: 10,
            high_risk_ranges: vec![
                Cidr::new(Ipv4Addr::new(5, 255, 0, 0), 16),
                Cidr::new(Ipv4Addr::new(23, 129, 0, 0), 16),
                Cidr::new(Ipv4Addr::new(91, 0, 0, 0), 8),
                Cidr::new(Ipv4Addr::new(178, 0, 0, 0), 8),
            ],
            high_risk_range_points: 25,
            high_risk_asns: ["AS14061", "AS9009", "AS206092", "AS202425", "AS200052"]
                .into_iter()
                .map(String::from)
                .collect(),
            high_risk_asn_points: 25,
            sanctioned_countries: ["KP", "SY", "IR"].into_iter().map(String::from).collect(),
            sanctioned_geo_points: 40,
            untrusted_device_points: 15,
            missing_device_points: 10,
            login_velocity_limit: 5,
            login_velocity_points: 20,
            action_velocity_limit: 50,
            action_velocity_points: 15,
            rejection_limit: 3,
            rejection_points: 20,
            abuse_history_points: 30,
            require_liveness_at: 70,
            block_at: 85,
        }
    }
}
