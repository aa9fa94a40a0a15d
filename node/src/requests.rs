//! Request payloads. Every field is optional on the wire so that missing
//! values surface as the service's own validation errors.

use serde::{Deserialize, Serialize};

use faceguard_risk::Asn;
use faceguard_types::{ActiveChallengeResult, GeoInfo, PassiveSignals, VelocityCounters};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollRequest {
    pub user_id: Option<String>,
    pub tenant_id: Option<String>,
    pub region: Option<String>,
    pub embedding: Vec<f32>,
    pub user_seed: String,
    pub passive_signals: PassiveSignals,
    pub device_fingerprint: Option<String>,
    pub secure_hardware: Option<String>,
    pub consent_version: Option<String>,
    pub analytics_opt_in: bool,
    pub identification_opt_in: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub user_id: Option<String>,
    pub embedding: Vec<f32>,
    pub user_seed: String,
    pub passive_signals: PassiveSignals,
    pub active_challenge: ActiveChallengeResult,
    pub device_fingerprint: Option<String>,
    pub secure_hardware: Option<String>,
    pub velocity_counters: Option<VelocityCounters>,
    pub abuse_flags: Vec<String>,
    pub ip: Option<String>,
    pub asn: Option<Asn>,
    pub geo: Option<GeoInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifyRequest {
    pub embedding: Vec<f32>,
    pub user_seed: String,
    pub tenant_id: Option<String>,
    pub region: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecheckRequest {
    pub challenge_id: Option<String>,
    pub blink: bool,
    pub yaw: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectedActionRequest {
    pub user_id: Option<String>,
    pub challenge_id: Option<String>,
}

/// Actions that need a passed liveness challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtectedAction {
    SendMessage,
    MassLike,
    LoginNewDevice,
}

impl ProtectedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectedAction::SendMessage => "send_message",
            ProtectedAction::MassLike => "mass_like",
            ProtectedAction::LoginNewDevice => "login_new_device",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationActionRequest {
    pub alert_id: Option<String>,
    pub action: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentRequest {
    pub user_id: Option<String>,
    pub analytics: bool,
    pub biometrics: bool,
    pub version: Option<String>,
}

impl Default for ConsentRequest {
    fn default() -> Self {
        Self {
            user_id: None,
            analytics: false,
            biometrics: true,
            version: None,
        }
    }
}

/// A request naming only the data subject.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRef {
    pub user_id: Option<String>,
}

impl UserRef {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_sparse_payloads() {
        let req: VerifyRequest = serde_json::from_str(
            r#"{"user_id":"u1","asn":14061,"active_challenge":{"blink":true}}"#,
        )
        .unwrap();
        assert_eq!(req.user_id.as_deref(), Some("u1"));
        assert_eq!(req.asn, Some(Asn::Number(14061)));
        assert!(req.active_challenge.blink);
        assert!(!req.active_challenge.yaw);
        assert!(req.embedding.is_empty());
    }

    #[test]
    fn consent_defaults_to_biometrics_only() {
        let req: ConsentRequest = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert!(req.biometrics);
        assert!(!req.analytics);
        assert!(req.version.is_none());
    }
}
