//! Request-side signals fed into liveness and risk scoring.

use serde::{Deserialize, Serialize};

/// Passive anti-spoof indicators derived from the capture itself.
///
/// Each value is an anomaly score where higher means "more likely a spoof".
/// Missing values count as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveSignals {
    #[serde(default, alias = "glare_score")]
    pub glare: Option<f64>,
    #[serde(default, alias = "moire_score")]
    pub moire: Option<f64>,
    #[serde(default, alias = "flatness_score")]
    pub flatness: Option<f64>,
}

impl PassiveSignals {
    pub fn new(glare: f64, moire: f64, flatness: f64) -> Self {
        Self {
            glare: Some(glare),
            moire: Some(moire),
            flatness: Some(flatness),
        }
    }
}

/// Result of an active liveness challenge (user-performed actions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChallengeResult {
    #[serde(default)]
    pub blink: bool,
    #[serde(default)]
    pub yaw: bool,
}

impl ActiveChallengeResult {
    pub fn new(blink: bool, yaw: bool) -> Self {
        Self { blink, yaw }
    }
}

/// Recent activity counters for the requesting account or device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelocityCounters {
    #[serde(default)]
    pub logins: u32,
    #[serde(default)]
    pub actions: u32,
    #[serde(default)]
    pub rejections: u32,
}

/// Coarse geolocation of the request origin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}
