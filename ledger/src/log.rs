//! The audit log store.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use faceguard_store::{BlobStore, DocumentStore};
use faceguard_types::Clock;

use crate::entry::{subject_digest, AuditDocument, AuditEntry};
use crate::LedgerError;

/// Blob name of the audit log.
pub const AUDIT_BLOB: &str = "audit-log.json";

/// Action recorded after a subject's entries are erased.
const COMPACTION_ACTION: &str = "audit_compaction";

/// Authorization for rewriting the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactionGrant {
    /// Who authorized the erasure.
    pub actor: String,
    /// Why, e.g. `dsar_erase`.
    pub reason: String,
}

impl CompactionGrant {
    pub fn new(actor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            reason: reason.into(),
        }
    }

    /// Both an actor and a reason are required.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.actor.trim().is_empty() {
            return Err(LedgerError::InvalidGrant("actor is required".into()));
        }
        if self.reason.trim().is_empty() {
            return Err(LedgerError::InvalidGrant("reason is required".into()));
        }
        Ok(())
    }
}

/// Outcome of a successful chain verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    pub entries: usize,
    pub head: Option<String>,
}

/// Outcome of a subject compaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub removed: usize,
    /// Entries whose links were recomputed (not counting the marker entry).
    pub rehashed: usize,
    pub marker: AuditEntry,
}

pub struct AuditLog {
    doc: DocumentStore<AuditDocument>,
    clock: Arc<dyn Clock>,
}

impl AuditLog {
    pub fn new(blobs: Arc<dyn BlobStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            doc: DocumentStore::new(blobs, AUDIT_BLOB),
            clock,
        }
    }

    /// Append an event, chained to the current head.
    pub fn append(
        &self,
        action: &str,
        user_id: Option<&str>,
        detail: impl Into<String>,
    ) -> Result<AuditEntry, LedgerError> {
        let detail = detail.into();
        let ts = self.clock.now();
        let entry = self.doc.update(|doc| {
            let entry = new_entry(&doc.entries, action, user_id, detail, ts);
            doc.entries.push(entry.clone());
            entry
        })?;
        info!(action, id = %entry.id, "audit entry appended");
        Ok(entry)
    }

    /// Recompute every hash and link in order.
    pub fn verify_chain(&self) -> Result<ChainReport, LedgerError> {
        let doc = self.doc.load()?;
        verify_entries(&doc.entries).inspect_err(|e| error!(error = %e, "audit chain verification failed"))?;
        Ok(ChainReport {
            entries: doc.entries.len(),
            head: doc.entries.last().map(|e| e.hash.clone()),
        })
    }

    /// Erase every entry about `user_id` and relink the chain.
    ///
    /// The existing chain must verify first. The whole rewrite, including
    /// the appended `audit_compaction` marker, happens under one lock.
    pub fn compact_subject(
        &self,
        user_id: &str,
        grant: &CompactionGrant,
    ) -> Result<CompactionReport, LedgerError> {
        grant.validate()?;
        let ts = self.clock.now();

        let report = self.doc.try_modify(|doc| {
            verify_entries(&doc.entries)?;

            let first_removed = doc
                .entries
                .iter()
                .position(|e| e.user_id.as_deref() == Some(user_id));
            let before = doc.entries.len();
            doc.entries.retain(|e| e.user_id.as_deref() != Some(user_id));
            let removed = before - doc.entries.len();

            let mut rehashed = 0;
            if let Some(start) = first_removed {
                for i in start..doc.entries.len() {
                    let prev = i.checked_sub(1).map(|p| doc.entries[p].hash.clone());
                    doc.entries[i].relink(prev);
                    rehashed += 1;
                }
            }

            let detail = format!(
                "Erased {removed} entries for subject {} by {} ({})",
                subject_digest(user_id),
                grant.actor,
                grant.reason
            );
            let marker = new_entry(&doc.entries, COMPACTION_ACTION, None, detail, ts);
            doc.entries.push(marker.clone());

            Ok::<_, LedgerError>((
                CompactionReport {
                    removed,
                    rehashed,
                    marker,
                },
                true,
            ))
        })?;

        warn!(
            actor = %grant.actor,
            reason = %grant.reason,
            removed = report.removed,
            rehashed = report.rehashed,
            "audit log compacted"
        );
        Ok(report)
    }

    pub fn entries(&self) -> Result<Vec<AuditEntry>, LedgerError> {
        Ok(self.doc.load()?.entries)
    }

    /// The last `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Result<Vec<AuditEntry>, LedgerError> {
        let entries = self.doc.load()?.entries;
        Ok(entries.into_iter().rev().take(n).collect())
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.doc.load()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }
}

fn new_entry(
    chain: &[AuditEntry],
    action: &str,
    user_id: Option<&str>,
    detail: String,
    ts: faceguard_types::Timestamp,
) -> AuditEntry {
    let mut entry = AuditEntry {
        id: Uuid::new_v4().to_string(),
        action: action.to_string(),
        user_id: user_id.map(str::to_string),
        detail,
        ts,
        prev_hash: None,
        hash: String::new(),
    };
    entry.relink(chain.last().map(|e| e.hash.clone()));
    entry
}

fn verify_entries(entries: &[AuditEntry]) -> Result<(), LedgerError> {
    let mut expected_prev: Option<&str> = None;
    for (index, entry) in entries.iter().enumerate() {
        if entry.prev_hash.as_deref() != expected_prev {
            return Err(LedgerError::ChainBroken {
                index,
                reason: "prev_hash does not match the preceding entry".into(),
            });
        }
        if entry.compute_hash() != entry.hash {
            return Err(LedgerError::ChainBroken {
                index,
                reason: "stored hash does not match entry contents".into(),
            });
        }
        expected_prev = Some(&entry.hash);
    }
    Ok(())
}
