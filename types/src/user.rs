//! Enrolled user records.

use serde::{Deserialize, Serialize};

use crate::legal::ConsentRecord;
use crate::params::{DEFAULT_REGION, DEFAULT_TENANT};
use crate::risk::RiskAssessment;
use crate::template::BiohashTemplate;
use crate::time::Timestamp;

/// A device bound to a user after a successful enrollment or verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedDevice {
    pub fingerprint: String,
    pub secure_hardware: Option<String>,
    pub bound_at: Timestamp,
}

/// One past risk evaluation kept for the user's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskHistoryEntry {
    pub ts: Timestamp,
    pub risk: RiskAssessment,
}

/// How long biometric data for a user may be retained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub days: u64,
    /// Computed at creation: `created_at + days`.
    pub purge_at: Timestamp,
}

impl RetentionPolicy {
    pub fn starting_at(created_at: Timestamp, days: u64) -> Self {
        Self {
            days,
            purge_at: created_at.plus_days(days),
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.purge_at
    }
}

/// Everything the engine stores about an enrolled user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub tenant_id: String,
    pub region: String,
    pub created_at: Timestamp,
    pub biohashes: Vec<BiohashTemplate>,
    pub trusted_devices: Vec<TrustedDevice>,
    /// Append-only.
    pub risk_history: Vec<RiskHistoryEntry>,
    pub consent: Option<ConsentRecord>,
    pub identification_opt_in: bool,
    pub retention: RetentionPolicy,
}

impl UserRecord {
    /// Create a fresh record. Empty tenant/region fall back to the defaults.
    pub fn new(
        user_id: &str,
        tenant_id: &str,
        region: &str,
        retention_days: u64,
        now: Timestamp,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            tenant_id: non_empty_or(tenant_id, DEFAULT_TENANT),
            region: non_empty_or(region, DEFAULT_REGION),
            created_at: now,
            biohashes: Vec::new(),
            trusted_devices: Vec::new(),
            risk_history: Vec::new(),
            consent: None,
            identification_opt_in: false,
            retention: RetentionPolicy::starting_at(now, retention_days),
        }
    }

    pub fn is_trusted_device(&self, fingerprint: Option<&str>) -> bool {
        match fingerprint {
            Some(fp) => self.trusted_devices.iter().any(|d| d.fingerprint == fp),
            None => false,
        }
    }

    /// Bind a device, or refresh its binding time and hardware tag.
    ///
    /// Absent or empty fingerprints are ignored.
    pub fn bind_device(
        &mut self,
        fingerprint: Option<&str>,
        secure_hardware: Option<&str>,
        now: Timestamp,
    ) {
        let Some(fp) = fingerprint.filter(|fp| !fp.is_empty()) else {
            return;
        };
        match self.trusted_devices.iter_mut().find(|d| d.fingerprint == fp) {
            Some(device) => {
                device.bound_at = now;
                device.secure_hardware = secure_hardware.map(str::to_string);
            }
            None => self.trusted_devices.push(TrustedDevice {
                fingerprint: fp.to_string(),
                secure_hardware: secure_hardware.map(str::to_string),
                bound_at: now,
            }),
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_falls_back_to_default_partition() {
        let user = UserRecord::new("u1", "", "", 30, Timestamp::new(0));
        assert_eq!(user.tenant_id, DEFAULT_TENANT);
        assert_eq!(user.region, DEFAULT_REGION);
        assert_eq!(user.retention.purge_at, Timestamp::new(0).plus_days(30));
    }

    #[test]
    fn bind_device_upserts_by_fingerprint() {
        let mut user = UserRecord::new("u1", "t", "r", 30, Timestamp::new(0));
        user.bind_device(Some("dev-1"), Some("tpm"), Timestamp::new(10));
        user.bind_device(Some("dev-1"), Some("webauthn"), Timestamp::new(20));
        user.bind_device(Some("dev-2"), None, Timestamp::new(30));

        assert_eq!(user.trusted_devices.len(), 2);
        assert_eq!(user.trusted_devices[0].bound_at, Timestamp::new(20));
        assert_eq!(
            user.trusted_devices[0].secure_hardware.as_deref(),
            Some("webauthn")
        );
        assert!(user.is_trusted_device(Some("dev-2")));
        assert!(!user.is_trusted_device(Some("dev-3")));
    }

    #[test]
    fn bind_device_ignores_missing_fingerprint() {
        let mut user = UserRecord::new("u1", "t", "r", 30, Timestamp::new(0));
        user.bind_device(None, Some("tpm"), Timestamp::new(10));
        user.bind_device(Some(""), None, Timestamp::new(10));
        assert!(user.trusted_devices.is_empty());
        assert!(!user.is_trusted_device(None));
    }

    #[test]
    fn retention_expires_strictly_after_purge_at() {
        let policy = RetentionPolicy::starting_at(Timestamp::new(0), 1);
        assert!(!policy.is_expired(policy.purge_at));
        assert!(policy.is_expired(policy.purge_at.plus_millis(1)));
    }
}
