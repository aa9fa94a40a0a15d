//! Storage traits for FaceGuard.
//!
//! Every persistent structure in the engine is a single JSON document kept in
//! a named blob. Backends (filesystem, in-memory for testing) implement
//! [`BlobStore`]; a [`DocumentCodec`] may transform the bytes on the way in
//! and out (the vector index seals them). [`DocumentStore`] serializes every
//! read-modify-write so concurrent writers never lose updates.

pub mod blob;
pub mod codec;
pub mod document;
pub mod error;

pub use blob::BlobStore;
pub use codec::{DocumentCodec, PlainCodec};
pub use document::DocumentStore;
pub use error::StoreError;
