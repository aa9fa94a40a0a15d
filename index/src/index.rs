//! The vector index.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use faceguard_crypto::{cosine_similarity, SealingKey};
use faceguard_store::{BlobStore, DocumentStore};
use faceguard_types::Clock;

use crate::partition::{IndexDocument, PartitionKey, VectorRecord};
use crate::{IndexError, SealedCodec};

/// Blob name of the sealed index.
pub const INDEX_BLOB: &str = "vector-index.bin";

/// One identification candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub user_id: String,
    pub similarity: f64,
}

pub struct VectorIndex {
    doc: DocumentStore<IndexDocument>,
    clock: Arc<dyn Clock>,
}

impl VectorIndex {
    pub fn new(blobs: Arc<dyn BlobStore>, key: SealingKey, clock: Arc<dyn Clock>) -> Self {
        Self {
            doc: DocumentStore::with_codec(blobs, INDEX_BLOB, Box::new(SealedCodec::new(key))),
            clock,
        }
    }

    /// Matching strategy reported by the health endpoint.
    pub fn mode(&self) -> &'static str {
        "exact"
    }

    /// Add a template for `user_id`.
    ///
    /// Unless `allow_multiple` is set, the user's earlier vectors in the same
    /// partition are replaced.
    pub fn upsert(
        &self,
        tenant_id: &str,
        region: &str,
        user_id: &str,
        vector: &[f32],
        allow_multiple: bool,
    ) -> Result<(), IndexError> {
        let key = PartitionKey::new(tenant_id, region);
        let record = VectorRecord {
            user_id: user_id.to_string(),
            vector: vector.to_vec(),
            created_at: self.clock.now(),
        };
        let replaced = self.doc.update(|doc| {
            let partition = doc.partition_entry(&key);
            let replaced = if allow_multiple {
                0
            } else {
                partition.remove_user(user_id)
            };
            partition.vectors.push(record);
            replaced
        })?;
        debug!(partition = %key, user_id, replaced, "vector upserted");
        Ok(())
    }

    /// The `limit` most similar templates in a partition, best first.
    pub fn query(
        &self,
        tenant_id: &str,
        region: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Match>, IndexError> {
        let key = PartitionKey::new(tenant_id, region);
        let doc = self.doc.load()?;
        let Some(partition) = doc.partition(&key) else {
            return Ok(Vec::new());
        };
        let mut matches: Vec<Match> = partition
            .vectors
            .iter()
            .map(|r| Match {
                user_id: r.user_id.clone(),
                similarity: cosine_similarity(&r.vector, vector),
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(limit);
        Ok(matches)
    }

    /// Delete every vector of `user_id` in a partition.
    ///
    /// Nothing is written when the user had no vectors there.
    pub fn remove_user(
        &self,
        tenant_id: &str,
        region: &str,
        user_id: &str,
    ) -> Result<usize, IndexError> {
        let key = PartitionKey::new(tenant_id, region);
        let removed = self.doc.modify(|doc| {
            let removed = doc
                .partition_mut(&key)
                .map_or(0, |partition| partition.remove_user(user_id));
            (removed, removed > 0)
        })?;
        if removed > 0 {
            info!(partition = %key, user_id, removed, "user vectors removed");
        }
        Ok(removed)
    }

    pub fn partition_len(&self, tenant_id: &str, region: &str) -> Result<usize, IndexError> {
        let key = PartitionKey::new(tenant_id, region);
        Ok(self
            .doc
            .load()?
            .partition(&key)
            .map_or(0, |p| p.vectors.len()))
    }
}
