//! Consent and data-subject request registries.
//!
//! The service talks to both through traits so deployments can back them
//! with an external system. The JSON implementations here are plain CRUD.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use faceguard_crypto::{sign_hex, verify_hex};
use faceguard_store::{BlobStore, DocumentStore, StoreError};
use faceguard_types::{Clock, ConsentRecord, DsarRecord, Timestamp};

pub const CONSENT_BLOB: &str = "consent.json";
pub const DSAR_BLOB: &str = "dsar.json";

/// The consent choices a user submits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsentUpdate {
    pub version: String,
    pub analytics: bool,
    pub biometrics: bool,
}

pub trait ConsentRegistry: Send + Sync {
    fn get_consent(&self, user_id: &str) -> Result<Option<ConsentRecord>, StoreError>;

    /// Create or replace the user's consent record.
    fn set_consent(&self, user_id: &str, update: ConsentUpdate)
        -> Result<ConsentRecord, StoreError>;

    /// Returns whether a record existed.
    fn delete_consent(&self, user_id: &str) -> Result<bool, StoreError>;
}

pub trait DsarRegistry: Send + Sync {
    fn get_dsar(&self, user_id: &str) -> Result<Option<DsarRecord>, StoreError>;

    /// Create or replace the user's request record.
    fn set_dsar(&self, record: DsarRecord) -> Result<(), StoreError>;
}

/// Show the consent banner when there is no record or it predates `current_version`.
pub fn should_show_consent_banner(consent: Option<&ConsentRecord>, current_version: &str) -> bool {
    consent.map_or(true, |c| c.version != current_version)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ConsentDocument {
    records: Vec<ConsentRecord>,
}

pub struct JsonConsentRegistry {
    doc: DocumentStore<ConsentDocument>,
    clock: Arc<dyn Clock>,
}

impl JsonConsentRegistry {
    pub fn new(blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            doc: DocumentStore::new(blobs, CONSENT_BLOB),
            clock,
        }
    }
}

impl ConsentRegistry for JsonConsentRegistry {
    fn get_consent(&self, user_id: &str) -> Result<Option<ConsentRecord>, StoreError> {
        Ok(self
            .doc
            .load()?
            .records
            .into_iter()
            .find(|r| r.user_id == user_id))
    }

    fn set_consent(
        &self,
        user_id: &str,
        update: ConsentUpdate,
    ) -> Result<ConsentRecord, StoreError> {
        let record = ConsentRecord {
            user_id: user_id.to_string(),
            version: update.version,
            analytics: update.analytics,
            biometrics: update.biometrics,
            timestamp: self.clock.now(),
        };
        self.doc.update(|doc| {
            match doc.records.iter_mut().find(|r| r.user_id == user_id) {
                Some(existing) => *existing = record.clone(),
                None => doc.records.push(record.clone()),
            }
        })?;
        Ok(record)
    }

    fn delete_consent(&self, user_id: &str) -> Result<bool, StoreError> {
        self.doc.modify(|doc| {
            let before = doc.records.len();
            doc.records.retain(|r| r.user_id != user_id);
            let removed = doc.records.len() != before;
            (removed, removed)
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct DsarDocument {
    records: Vec<DsarRecord>,
}

pub struct JsonDsarRegistry {
    doc: DocumentStore<DsarDocument>,
}

impl JsonDsarRegistry {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            doc: DocumentStore::new(blobs, DSAR_BLOB),
        }
    }
}

impl DsarRegistry for JsonDsarRegistry {
    fn get_dsar(&self, user_id: &str) -> Result<Option<DsarRecord>, StoreError> {
        Ok(self
            .doc
            .load()?
            .records
            .into_iter()
            .find(|r| r.user_id == user_id))
    }

    fn set_dsar(&self, record: DsarRecord) -> Result<(), StoreError> {
        self.doc.update(|doc| {
            match doc.records.iter_mut().find(|r| r.user_id == record.user_id) {
                Some(existing) => *existing = record,
                None => doc.records.push(record),
            }
        })
    }
}

/// Decoded form of a DSAR receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsarReceipt {
    /// `<user_id>:<action>:<millis>`.
    pub payload: String,
    /// HMAC-SHA256 of `payload`, hex.
    pub signature: String,
}

/// Issue a signed receipt for a completed request: base64url (unpadded) of
/// the JSON `{payload, signature}`.
pub fn make_receipt(secret: &[u8], user_id: &str, action: &str, now: Timestamp) -> String {
    let payload = format!("{user_id}:{action}:{}", now.as_millis());
    let signature = sign_hex(secret, payload.as_bytes());
    let receipt = DsarReceipt { payload, signature };
    // Two plain strings always serialize.
    let json = serde_json::to_vec(&receipt).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a receipt and check its signature. `None` if either fails.
pub fn open_receipt(secret: &[u8], receipt: &str) -> Option<DsarReceipt> {
    let json = URL_SAFE_NO_PAD.decode(receipt.trim()).ok()?;
    let decoded: DsarReceipt = serde_json::from_slice(&json).ok()?;
    verify_hex(secret, decoded.payload.as_bytes(), &decoded.signature).then_some(decoded)
}
