//! Cancellable biometric templates.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Every face embedding accepted by the engine has exactly this many components.
pub const EMBEDDING_DIM: usize = 512;

/// A biohashed template stored for a user.
///
/// The vector is the unit-norm output of the biohash transform, never the raw
/// embedding. Templates are immutable once created; revocation happens by
/// deleting them or rotating the seed that produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiohashTemplate {
    pub vector: Vec<f32>,
    pub created_at: Timestamp,
    /// Passive-liveness score observed at enrollment.
    pub passive_score: f64,
    pub device_fingerprint: Option<String>,
    /// Secure-hardware attestation tag reported by the capturing device.
    pub secure_hardware: Option<String>,
    /// Consent version in effect when the template was captured.
    pub consent_version: String,
}
