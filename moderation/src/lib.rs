//! Human review of blocked authentication attempts.
//!
//! Every risk block opens a pending [`ModerationAlert`]. An operator resolves
//! it once, as approved, denied or banned; denials and bans revoke the user's
//! biometric enrollment downstream through a `face.revoked` webhook. Both
//! steps are recorded in the audit log.

pub mod alert;
pub mod error;
pub mod queue;

pub use alert::{AlertStatus, ModerationAction, ModerationAlert, ModerationDocument};
pub use error::ModerationError;
pub use queue::{ModerationQueue, MODERATION_BLOB};
