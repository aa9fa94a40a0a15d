//! Event names and the persisted event log.

use serde::{Deserialize, Serialize};
use std::fmt;

use faceguard_types::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    FaceEnrolled,
    FaceRevoked,
    RiskAlert,
    LivenessFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FaceEnrolled => "face.enrolled",
            EventKind::FaceRevoked => "face.revoked",
            EventKind::RiskAlert => "risk.alert",
            EventKind::LivenessFailed => "liveness.failed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One signed event as recorded in the local log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub timestamp: Timestamp,
    pub payload: serde_json::Value,
    /// Hex HMAC-SHA256 over the serialized `{event, timestamp, payload}`.
    pub signature: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookLog {
    pub events: Vec<WebhookEvent>,
}
