//! Alerts, their lifecycle and operator actions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use faceguard_types::Timestamp;

use crate::ModerationError;

/// ```text
/// pending ──approve──► approved
///    ├─────deny──────► denied
///    └─────ban───────► ban
/// ```
/// Every resolved state is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Approved,
    Denied,
    Ban,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Approved => "approved",
            AlertStatus::Denied => "denied",
            AlertStatus::Ban => "ban",
        }
    }

    /// Denials and bans revoke the user's enrollment.
    pub fn revokes_enrollment(&self) -> bool {
        matches!(self, AlertStatus::Denied | AlertStatus::Ban)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Deny,
    Ban,
}

impl ModerationAction {
    pub fn resulting_status(&self) -> AlertStatus {
        match self {
            ModerationAction::Approve => AlertStatus::Approved,
            ModerationAction::Deny => AlertStatus::Denied,
            ModerationAction::Ban => AlertStatus::Ban,
        }
    }
}

impl FromStr for ModerationAction {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(ModerationAction::Approve),
            "deny" | "denied" => Ok(ModerationAction::Deny),
            "ban" => Ok(ModerationAction::Ban),
            _ => Err(ModerationError::InvalidAction(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationAlert {
    pub id: String,
    pub user_id: String,
    pub score: u32,
    pub reasons: Vec<String>,
    pub created_at: Timestamp,
    pub status: AlertStatus,
    #[serde(default)]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub resolved_at: Option<Timestamp>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationDocument {
    pub alerts: Vec<ModerationAlert>,
}
