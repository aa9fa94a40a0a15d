//! Nullable store: thread-safe in-memory blobs for testing.

use faceguard_store::{BlobStore, StoreError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// An in-memory blob store.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl NullBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes of a blob, bypassing any codec.
    pub fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(name).cloned()
    }

    /// Overwrite a blob's raw bytes, e.g. to simulate tampering.
    pub fn put_raw(&self, name: &str, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(name.to_string(), bytes);
    }
}

impl BlobStore for NullBlobStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().unwrap().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("write to {name} refused")));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.blobs.lock().unwrap().remove(name);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .blobs
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let store = NullBlobStore::new();
        store.write("a", b"1").unwrap();
        assert_eq!(store.read("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn refused_writes_change_nothing() {
        let store = NullBlobStore::new();
        store.fail_writes(true);
        assert!(matches!(store.write("a", b"1"), Err(StoreError::Backend(_))));
        assert_eq!(store.read("a").unwrap(), None);
        assert_eq!(store.write_count(), 0);
    }
}
