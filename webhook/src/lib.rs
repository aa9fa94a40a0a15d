//! Outbound event notifications.
//!
//! Every event is signed with HMAC-SHA256 and appended to a durable local log
//! before anything touches the network. When an endpoint is configured, the
//! signed body is then POSTed on a background task. Delivery is best effort:
//! failures are logged and never retried or reported to the caller.

pub mod config;
pub mod error;
pub mod event;
pub mod notifier;

pub use config::WebhookConfig;
pub use error::WebhookError;
pub use event::{EventKind, WebhookEvent, WebhookLog};
pub use notifier::{WebhookNotifier, SIGNATURE_HEADER, TIMESTAMP_HEADER, WEBHOOK_BLOB};
