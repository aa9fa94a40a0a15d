//! Tamper-evident audit log.
//!
//! Every security-relevant event is appended as an [`AuditEntry`] whose hash
//! covers its own fields and the previous entry's hash. Editing, dropping or
//! reordering any entry breaks the chain, which [`AuditLog::verify_chain`]
//! detects.
//!
//! The only sanctioned rewrite is [`AuditLog::compact_subject`]: erasing one
//! data subject's entries for a privacy request. It requires a
//! [`CompactionGrant`], refuses to run over an already broken chain, and
//! leaves a permanent `audit_compaction` entry behind.

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{AuditDocument, AuditEntry};
pub use error::LedgerError;
pub use log::{AuditLog, ChainReport, CompactionGrant, CompactionReport, AUDIT_BLOB};
