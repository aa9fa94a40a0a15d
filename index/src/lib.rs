//! Encrypted, partitioned template index.
//!
//! Templates are grouped into partitions keyed by `(tenant, region)` and
//! matched by exhaustive cosine scan within one partition. The whole index is
//! one AES-256-GCM sealed document; every mutation is a serialized
//! read-decrypt-modify-encrypt-write.

pub mod codec;
pub mod error;
pub mod index;
pub mod partition;

pub use codec::SealedCodec;
pub use error::IndexError;
pub use index::{Match, VectorIndex, INDEX_BLOB};
pub use partition::{IndexDocument, PartitionKey, VectorPartition, VectorRecord};
