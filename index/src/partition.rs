//! Index partitions and their persisted layout.

use serde::{Deserialize, Serialize};
use std::fmt;

use faceguard_types::{Timestamp, DEFAULT_REGION, DEFAULT_TENANT};

/// `(tenant, region)` with empty parts replaced by the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    pub tenant_id: String,
    pub region: String,
}

impl PartitionKey {
    pub fn new(tenant_id: &str, region: &str) -> Self {
        let or_default = |v: &str, d: &str| {
            if v.is_empty() {
                d.to_string()
            } else {
                v.to_string()
            }
        };
        Self {
            tenant_id: or_default(tenant_id, DEFAULT_TENANT),
            region: or_default(region, DEFAULT_REGION),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.tenant_id, self.region)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub user_id: String,
    pub vector: Vec<f32>,
    pub created_at: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorPartition {
    pub tenant_id: String,
    pub region: String,
    pub vectors: Vec<VectorRecord>,
}

impl VectorPartition {
    fn matches(&self, key: &PartitionKey) -> bool {
        self.tenant_id == key.tenant_id && self.region == key.region
    }

    /// Remove every vector of `user_id`; returns how many went.
    pub fn remove_user(&mut self, user_id: &str) -> usize {
        let before = self.vectors.len();
        self.vectors.retain(|v| v.user_id != user_id);
        before - self.vectors.len()
    }
}

/// The whole index as persisted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub partitions: Vec<VectorPartition>,
}

impl IndexDocument {
    pub fn partition(&self, key: &PartitionKey) -> Option<&VectorPartition> {
        self.partitions.iter().find(|p| p.matches(key))
    }

    pub fn partition_mut(&mut self, key: &PartitionKey) -> Option<&mut VectorPartition> {
        self.partitions.iter_mut().find(|p| p.matches(key))
    }

    /// The partition for `key`, created empty if absent.
    pub fn partition_entry(&mut self, key: &PartitionKey) -> &mut VectorPartition {
        let pos = match self.partitions.iter().position(|p| p.matches(key)) {
            Some(pos) => pos,
            None => {
                self.partitions.push(VectorPartition {
                    tenant_id: key.tenant_id.clone(),
                    region: key.region.clone(),
                    vectors: Vec::new(),
                });
                self.partitions.len() - 1
            }
        };
        &mut self.partitions[pos]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parts_use_defaults() {
        let key = PartitionKey::new("", "");
        assert_eq!(key.to_string(), "default::global");
        assert_eq!(PartitionKey::new("acme", "eu").to_string(), "acme::eu");
    }

    #[test]
    fn partition_entry_creates_once() {
        let mut doc = IndexDocument::default();
        let key = PartitionKey::new("acme", "eu");
        doc.partition_entry(&key);
        doc.partition_entry(&key);
        assert_eq!(doc.partitions.len(), 1);
        assert!(doc.partition(&PartitionKey::new("acme", "us")).is_none());
    }
}
