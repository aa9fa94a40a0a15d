//! Named blob storage trait.

use crate::StoreError;

/// A flat namespace of byte blobs.
///
/// Names may contain `/` to group related blobs (e.g. `dsar/<user>.json`);
/// backends map them onto whatever hierarchy they have.
pub trait BlobStore: Send + Sync {
    /// Read a blob. A blob that was never written is `Ok(None)`.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace a blob's contents. Readers see either the old or the new
    /// bytes, never a mix.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Delete a blob. Deleting a missing blob is not an error.
    fn remove(&self, name: &str) -> Result<(), StoreError>;

    /// Names of the blobs under `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
