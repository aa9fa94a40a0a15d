use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_secret() -> String {
    "webhook_dev_secret".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Webhook delivery settings (`[webhook]` in the daemon configuration).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Delivery endpoint. Events are only logged locally when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// HMAC key for event signatures.
    #[serde(default = "default_secret")]
    pub secret: String,

    /// PEM client certificate for mutual TLS. Used only together with
    /// `mtls_key`, and only when both files exist.
    #[serde(default)]
    pub mtls_cert: Option<PathBuf>,

    #[serde(default)]
    pub mtls_key: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: default_secret(),
            mtls_cert: None,
            mtls_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    /// The configured endpoint, if any. Blank strings count as unset.
    pub fn endpoint(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Both mTLS paths, when both are configured and present on disk.
    pub fn mtls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.mtls_cert, &self.mtls_key) {
            (Some(cert), Some(key)) if cert.is_file() && key.is_file() => Some((cert, key)),
            _ => None,
        }
    }
}
