//! Service configuration with TOML file and environment support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use faceguard_risk::RiskPolicy;
use faceguard_types::FaceParams;
use faceguard_webhook::WebhookConfig;

use crate::{LogFormat, ServiceError};

/// Configuration for a FaceGuard service.
///
/// Can be loaded from a TOML file via [`FaceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Environment variables are
/// layered on top with [`FaceConfig::apply_env_overrides`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaceConfig {
    /// Directory holding every persisted document.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Secret from which the vector index sealing key is derived.
    /// A 64-character hex string is used as the raw key.
    #[serde(default = "default_vector_key")]
    pub vector_key: String,

    /// HMAC key for erasure receipts.
    #[serde(default = "default_receipt_secret")]
    pub dsar_receipt_secret: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub params: FaceParams,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub risk: RiskPolicy,

    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Background job schedule (`[jobs]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_retention_interval")]
    pub retention_interval_secs: u64,

    #[serde(default = "default_bias_interval")]
    pub bias_interval_secs: u64,

    /// Alert when the largest TAR/FAR ratio exceeds the smallest by more
    /// than this factor.
    #[serde(default = "default_bias_ratio")]
    pub bias_ratio_threshold: f64,

    #[serde(default = "default_sweep_interval")]
    pub challenge_sweep_interval_secs: u64,

    /// Challenges older than this are dropped by the sweep.
    #[serde(default = "default_challenge_max_age")]
    pub challenge_max_age_secs: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./faceguard_data")
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}

fn default_vector_key() -> String {
    "vector_dev_key_vector_dev_key_32".to_string()
}

fn default_receipt_secret() -> String {
    "dsar_dev_secret".to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retention_interval() -> u64 {
    24 * 60 * 60
}

fn default_bias_interval() -> u64 {
    6 * 60 * 60
}

fn default_bias_ratio() -> f64 {
    1.5
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_challenge_max_age() -> u64 {
    60 * 60
}

const REDACTED: &str = "[REDACTED]";

// ── Impl ───────────────────────────────────────────────────────────────

impl FaceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, ServiceError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServiceError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ServiceError> {
        toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ServiceError> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// A copy with every key and secret replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in [
            &mut config.vector_key,
            &mut config.dsar_receipt_secret,
            &mut config.webhook.secret,
        ] {
            if !secret.is_empty() {
                *secret = REDACTED.to_string();
            }
        }
        config
    }

    pub fn log_format(&self) -> Result<LogFormat, ServiceError> {
        self.log_format.parse()
    }

    /// Layer the process environment over this configuration.
    pub fn apply_env_overrides(&mut self) -> Result<(), ServiceError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Layer overrides from `lookup` (an environment-style key/value source).
    ///
    /// Unset and empty values leave the current setting alone; values that
    /// fail to parse are a configuration error naming the variable.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ServiceError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let p = &mut self.params;
        parse_into(&get, "FACE_SIM_THRESHOLD", &mut p.similarity_threshold)?;
        parse_into(&get, "FACE_IDENTIFICATION_LIMIT", &mut p.identification_limit)?;
        parse_into(&get, "FACE_ALPHA", &mut p.alpha)?;
        parse_into(&get, "FACE_BETA", &mut p.beta)?;
        parse_into(&get, "FACE_LIVENESS_THRESHOLD", &mut p.liveness_threshold)?;
        parse_into(&get, "FACE_CHALLENGE_COOLDOWN_MS", &mut p.challenge_cooldown_ms)?;
        parse_into(&get, "FACE_CHALLENGE_MAX_ATTEMPTS", &mut p.challenge_max_attempts)?;
        parse_into(&get, "FACE_RETENTION_DAYS", &mut p.retention_days)?;
        if let Some(v) = get("FACE_CONSENT_VERSION") {
            p.consent_version = v;
        }

        let w = &mut self.webhook;
        if let Some(v) = get("FACE_WEBHOOK_URL") {
            w.url = Some(v);
        }
        if let Some(v) = get("FACE_WEBHOOK_SECRET") {
            w.secret = v;
        }
        if let Some(v) = get("FACE_WEBHOOK_MTLS_CERT") {
            w.mtls_cert = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FACE_WEBHOOK_MTLS_KEY") {
            w.mtls_key = Some(PathBuf::from(v));
        }

        if let Some(v) = get("VECTOR_KMS_KEY") {
            self.vector_key = v;
        }
        if let Some(v) = get("DSAR_RECEIPT_SECRET") {
            self.dsar_receipt_secret = v;
        }
        Ok(())
    }
}

fn parse_into<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<(), ServiceError>
where
    T::Err: std::fmt::Display,
{
    if let Some(raw) = get(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| ServiceError::Config(format!("{key}={raw}: {e}")))?;
    }
    Ok(())
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            bind: default_bind(),
            port: default_port(),
            vector_key: default_vector_key(),
            dsar_receipt_secret: default_receipt_secret(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            params: FaceParams::default(),
            webhook: WebhookConfig::default(),
            risk: RiskPolicy::default(),
            jobs: JobsConfig::default(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_interval_secs: default_retention_interval(),
            bias_interval_secs: default_bias_interval(),
            bias_ratio_threshold: default_bias_ratio(),
            challenge_sweep_interval_secs: default_sweep_interval(),
            challenge_max_age_secs: default_challenge_max_age(),
        }
    }
}
