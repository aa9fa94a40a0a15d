//! Signing, logging and delivery.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use faceguard_crypto::sign_hex;
use faceguard_store::{BlobStore, DocumentStore};
use faceguard_types::{Clock, Timestamp};

use crate::event::{EventKind, WebhookEvent, WebhookLog};
use crate::{WebhookConfig, WebhookError};

/// Blob name of the local event log.
pub const WEBHOOK_BLOB: &str = "webhooks.json";

pub const SIGNATURE_HEADER: &str = "X-Face-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Face-Timestamp";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The signed part of an event, in wire order.
#[derive(Serialize)]
struct SignedBody<'a> {
    event: &'a str,
    timestamp: Timestamp,
    payload: &'a serde_json::Value,
}

struct Delivery {
    url: String,
    client: reqwest::Client,
}

pub struct WebhookNotifier {
    log: DocumentStore<WebhookLog>,
    secret: Vec<u8>,
    delivery: Option<Delivery>,
    clock: Arc<dyn Clock>,
}

impl WebhookNotifier {
    /// Build a notifier. The HTTP client (and mTLS identity, if configured)
    /// is set up once here, so a bad certificate fails at startup.
    pub fn new(
        config: &WebhookConfig,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WebhookError> {
        let delivery = match config.endpoint() {
            Some(url) => Some(Delivery {
                url: url.to_string(),
                client: build_client(config)?,
            }),
            None => None,
        };
        Ok(Self {
            log: DocumentStore::new(blobs, WEBHOOK_BLOB),
            secret: config.secret.as_bytes().to_vec(),
            delivery,
            clock,
        })
    }

    /// Sign and record an event, then hand it to delivery.
    ///
    /// Only recording can fail; delivery problems are logged.
    pub fn notify(
        &self,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<WebhookEvent, WebhookError> {
        let timestamp = self.clock.now();
        let body = serde_json::to_vec(&SignedBody {
            event: event.as_str(),
            timestamp,
            payload: &payload,
        })?;
        let signature = sign_hex(&self.secret, &body);

        let record = WebhookEvent {
            event: event.as_str().to_string(),
            timestamp,
            payload,
            signature,
        };
        self.log.update(|log| log.events.push(record.clone()))?;
        debug!(event = %event, "webhook event recorded");

        if let Some(delivery) = &self.delivery {
            self.dispatch(delivery, event, body, &record);
        }
        Ok(record)
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Result<Vec<WebhookEvent>, WebhookError> {
        Ok(self.log.load()?.events)
    }

    fn dispatch(&self, delivery: &Delivery, event: EventKind, body: Vec<u8>, record: &WebhookEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(event = %event, "no async runtime, webhook not delivered");
            return;
        };
        let request = delivery
            .client
            .post(&delivery.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, &record.signature)
            .header(TIMESTAMP_HEADER, record.timestamp.as_millis().to_string())
            .body(body);

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(event = %event, "webhook delivered");
                }
                Ok(response) => {
                    warn!(event = %event, status = %response.status(), "webhook rejected");
                }
                Err(e) => {
                    warn!(event = %event, error = %e, "webhook delivery failed");
                }
            }
        });
    }
}

fn build_client(config: &WebhookConfig) -> Result<reqwest::Client, WebhookError> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .connect_timeout(CONNECT_TIMEOUT);

    if let Some((cert, key)) = config.mtls_paths() {
        let mut pem = std::fs::read(cert)
            .map_err(|e| WebhookError::Identity(format!("{}: {e}", cert.display())))?;
        pem.push(b'\n');
        pem.extend(
            std::fs::read(key)
                .map_err(|e| WebhookError::Identity(format!("{}: {e}", key.display())))?,
        );
        let identity = reqwest::Identity::from_pem(&pem)
            .map_err(|e| WebhookError::Identity(e.to_string()))?;
        builder = builder.identity(identity);
        debug!(cert = %cert.display(), "webhook mTLS identity loaded");
    }

    builder
        .build()
        .map_err(|e| WebhookError::Client(e.to_string()))
}
