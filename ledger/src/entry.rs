//! Audit entries and their hash.

use serde::{Deserialize, Serialize};

use faceguard_crypto::sha256_hex;
use faceguard_types::Timestamp;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub action: String,
    pub user_id: Option<String>,
    pub detail: String,
    pub ts: Timestamp,
    /// Hash of the preceding entry; `None` for the first.
    pub prev_hash: Option<String>,
    pub hash: String,
}

/// The hashed fields, in their canonical serialization order.
#[derive(Serialize)]
struct HashedBody<'a> {
    id: &'a str,
    action: &'a str,
    user_id: Option<&'a str>,
    detail: &'a str,
    ts: Timestamp,
    prev_hash: Option<&'a str>,
}

impl AuditEntry {
    /// `sha256_hex(canonical_json(body) ‖ prev_hash)`.
    pub fn compute_hash(&self) -> String {
        let body = HashedBody {
            id: &self.id,
            action: &self.action,
            user_id: self.user_id.as_deref(),
            detail: &self.detail,
            ts: self.ts,
            prev_hash: self.prev_hash.as_deref(),
        };
        // Serializing plain strings and integers cannot fail.
        let mut preimage = serde_json::to_vec(&body).unwrap_or_default();
        preimage.extend_from_slice(self.prev_hash.as_deref().unwrap_or("").as_bytes());
        sha256_hex(&preimage)
    }

    /// Re-link to `prev_hash` and recompute the hash.
    pub(crate) fn relink(&mut self, prev_hash: Option<String>) {
        self.prev_hash = prev_hash;
        self.hash = self.compute_hash();
    }
}

/// Digest of a data subject's id, recorded in place of the id after erasure.
pub fn subject_digest(user_id: &str) -> String {
    sha256_hex(user_id.as_bytes())
}

/// The persisted log.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDocument {
    pub entries: Vec<AuditEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> AuditEntry {
        let mut e = AuditEntry {
            id: "e1".into(),
            action: "face_enroll".into(),
            user_id: Some("u1".into()),
            detail: "Enrollment with passive score 0.95".into(),
            ts: Timestamp::new(1_000),
            prev_hash: None,
            hash: String::new(),
        };
        e.relink(None);
        e
    }

    #[test]
    fn hash_is_stable() {
        let e = entry();
        assert_eq!(e.hash.len(), 64);
        assert_eq!(e.compute_hash(), e.hash);
    }

    #[test]
    fn every_field_is_covered() {
        let base = entry();
        let mutations: Vec<Box<dyn Fn(&mut AuditEntry)>> = vec![
            Box::new(|e| e.id.push('x')),
            Box::new(|e| e.action.push('x')),
            Box::new(|e| e.user_id = None),
            Box::new(|e| e.detail.push('x')),
            Box::new(|e| e.ts = Timestamp::new(1_001)),
            Box::new(|e| e.prev_hash = Some("00".into())),
        ];
        for mutate in mutations {
            let mut e = base.clone();
            mutate(&mut e);
            assert_ne!(e.compute_hash(), base.hash);
        }
    }
}
