//! The face-user store.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use faceguard_store::{BlobStore, DocumentStore, StoreError};
use faceguard_types::{Timestamp, UserRecord};

/// Blob name of the user store.
pub const USERS_BLOB: &str = "face-users.json";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub users: Vec<UserRecord>,
}

impl UserDocument {
    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    pub fn get_mut(&mut self, user_id: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.user_id == user_id)
    }
}

/// Enrolled users, one JSON document guarded by the store's lock.
pub struct UserStore {
    doc: DocumentStore<UserDocument>,
}

impl UserStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            doc: DocumentStore::new(blobs, USERS_BLOB),
        }
    }

    pub fn get(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.doc.load()?.get(user_id).cloned())
    }

    /// Apply `f` to an existing user. `None` (and no write) if absent.
    pub fn update_user<R>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut UserRecord) -> R,
    ) -> Result<Option<R>, StoreError> {
        self.doc.modify(|doc| match doc.get_mut(user_id) {
            Some(user) => (Some(f(user)), true),
            None => (None, false),
        })
    }

    /// Apply `f` to a user, creating the record with `create` first if needed.
    pub fn upsert_with<R>(
        &self,
        user_id: &str,
        create: impl FnOnce() -> UserRecord,
        f: impl FnOnce(&mut UserRecord) -> R,
    ) -> Result<R, StoreError> {
        self.doc.update(|doc| {
            let index = match doc.users.iter().position(|u| u.user_id == user_id) {
                Some(index) => index,
                None => {
                    debug!(user_id, "creating user record");
                    doc.users.push(create());
                    doc.users.len() - 1
                }
            };
            f(&mut doc.users[index])
        })
    }

    /// Delete a user, returning the removed record.
    pub fn remove(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        self.doc.modify(|doc| {
            match doc.users.iter().position(|u| u.user_id == user_id) {
                Some(index) => (Some(doc.users.remove(index)), true),
                None => (None, false),
            }
        })
    }

    /// Delete every user whose retention window ended before `now`.
    pub fn purge_expired(&self, now: Timestamp) -> Result<Vec<UserRecord>, StoreError> {
        self.doc.modify(|doc| {
            let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut doc.users)
                .into_iter()
                .partition(|u| u.retention.is_expired(now));
            doc.users = kept;
            let changed = !expired.is_empty();
            (expired, changed)
        })
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.doc.load()?.users.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
