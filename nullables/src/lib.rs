//! Nullable infrastructure for deterministic testing.
//!
//! The engine reaches time and storage only through the [`Clock`] and
//! [`BlobStore`] traits. This crate provides test-friendly implementations
//! that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.
//!
//! [`Clock`]: faceguard_types::Clock
//! [`BlobStore`]: faceguard_store::BlobStore

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullBlobStore;
