//! Outcome counters per demographic group and the disparity check run by
//! the bias monitor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use faceguard_store::{BlobStore, DocumentStore, StoreError};

pub const BIAS_BLOB: &str = "bias-metrics.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    TrueAccept,
    FalseReject,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub true_accept: u64,
    pub false_reject: u64,
    pub attempts: u64,
}

impl GroupStats {
    pub fn tar(&self) -> f64 {
        rate(self.true_accept, self.attempts)
    }

    pub fn far(&self) -> f64 {
        rate(self.false_reject, self.attempts)
    }

    /// TAR/FAR, or `None` while the group has no false rejects.
    pub fn ratio(&self) -> Option<f64> {
        let far = self.far();
        (far > 0.0).then(|| self.tar() / far)
    }
}

fn rate(count: u64, attempts: u64) -> f64 {
    if attempts == 0 {
        0.0
    } else {
        count as f64 / attempts as f64
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasDocument {
    pub groups: BTreeMap<String, GroupStats>,
}

/// The groups at either end of the TAR/FAR spread.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisparityReport {
    pub highest_group: String,
    pub highest_ratio: f64,
    pub lowest_group: String,
    pub lowest_ratio: f64,
    pub spread: f64,
}

pub struct BiasTracker {
    doc: DocumentStore<BiasDocument>,
}

impl BiasTracker {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            doc: DocumentStore::new(blobs, BIAS_BLOB),
        }
    }

    pub fn record(&self, group: &str, outcome: Outcome) -> Result<(), StoreError> {
        self.doc.update(|doc| {
            let stats = doc.groups.entry(group.to_string()).or_default();
            stats.attempts += 1;
            match outcome {
                Outcome::TrueAccept => stats.true_accept += 1,
                Outcome::FalseReject => stats.false_reject += 1,
            }
        })
    }

    pub fn snapshot(&self) -> Result<BiasDocument, StoreError> {
        self.doc.load()
    }

    /// Compare TAR/FAR across groups. Groups without a defined ratio are
    /// skipped; at least two must remain.
    pub fn check_disparity(&self, threshold: f64) -> Result<Option<DisparityReport>, StoreError> {
        let doc = self.doc.load()?;
        let mut ratios: Vec<(&String, f64)> = doc
            .groups
            .iter()
            .filter_map(|(group, stats)| stats.ratio().map(|r| (group, r)))
            .collect();
        if ratios.len() < 2 {
            return Ok(None);
        }
        ratios.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (highest_group, highest_ratio) = ratios[0];
        let (lowest_group, lowest_ratio) = ratios[ratios.len() - 1];
        let spread = highest_ratio / if lowest_ratio > 0.0 { lowest_ratio } else { 1.0 };

        Ok((spread > threshold).then(|| DisparityReport {
            highest_group: highest_group.clone(),
            highest_ratio,
            lowest_group: lowest_group.clone(),
            lowest_ratio,
            spread,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceguard_nullables::NullBlobStore;

    fn tracker() -> BiasTracker {
        BiasTracker::new(Arc::new(NullBlobStore::new()))
    }

    fn feed(tracker: &BiasTracker, group: &str, accepts: u32, rejects: u32) {
        for _ in 0..accepts {
            tracker.record(group, Outcome::TrueAccept).unwrap();
        }
        for _ in 0..rejects {
            tracker.record(group, Outcome::FalseReject).unwrap();
        }
    }

    #[test]
    fn counters_accumulate() {
        let t = tracker();
        feed(&t, "eu", 3, 1);
        let stats = t.snapshot().unwrap().groups["eu"];
        assert_eq!(stats.attempts, 4);
        assert_eq!(stats.tar(), 0.75);
        assert_eq!(stats.far(), 0.25);
        assert_eq!(stats.ratio(), Some(3.0));
    }

    #[test]
    fn balanced_groups_do_not_alert() {
        let t = tracker();
        feed(&t, "eu", 9, 1);
        feed(&t, "us", 18, 2);
        assert_eq!(t.check_disparity(1.5).unwrap(), None);
    }

    #[test]
    fn skewed_groups_alert() {
        let t = tracker();
        feed(&t, "eu", 9, 1);
        feed(&t, "apac", 3, 1);
        let report = t.check_disparity(1.5).unwrap().unwrap();
        assert_eq!(report.highest_group, "eu");
        assert_eq!(report.lowest_group, "apac");
        assert!((report.spread - 3.0).abs() < 1e-9);
    }

    #[test]
    fn needs_two_comparable_groups() {
        let t = tracker();
        feed(&t, "eu", 9, 1);
        feed(&t, "us", 10, 0);
        assert_eq!(t.check_disparity(1.5).unwrap(), None);
    }
}
