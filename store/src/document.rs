//! A single JSON document with serialized read-modify-write.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::{BlobStore, DocumentCodec, PlainCodec, StoreError};

/// A typed document persisted as one blob.
///
/// All access goes through an internal mutex: [`update`](Self::update) and
/// [`modify`](Self::modify) hold it across read, mutation and write, so two
/// concurrent mutations are applied one after the other. A document that was
/// never written loads as `T::default()`.
pub struct DocumentStore<T> {
    blobs: Arc<dyn BlobStore>,
    name: String,
    codec: Box<dyn DocumentCodec>,
    guard: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> DocumentStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(blobs: Arc<dyn BlobStore>, name: impl Into<String>) -> Self {
        Self::with_codec(blobs, name, Box::new(PlainCodec))
    }

    pub fn with_codec(
        blobs: Arc<dyn BlobStore>,
        name: impl Into<String>,
        codec: Box<dyn DocumentCodec>,
    ) -> Self {
        Self {
            blobs,
            name: name.into(),
            codec,
            guard: Mutex::new(()),
            _doc: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the current document.
    pub fn load(&self) -> Result<T, StoreError> {
        let _held = self.lock();
        self.read_unlocked()
    }

    /// Apply `f` and always write the result back.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        self.modify(|doc| (f(doc), true))
    }

    /// Apply `f`; write back only when it reports a change.
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> Result<R, StoreError> {
        self.try_modify(|doc| Ok::<_, StoreError>(f(doc)))
    }

    /// Fallible variant of [`modify`](Self::modify). An error from `f`
    /// aborts without writing anything.
    pub fn try_modify<R, E>(
        &self,
        f: impl FnOnce(&mut T) -> Result<(R, bool), E>,
    ) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let _held = self.lock();
        let mut doc = self.read_unlocked()?;
        let (result, changed) = f(&mut doc)?;
        if changed {
            self.write_unlocked(&doc)?;
        } else {
            debug!(document = %self.name, "no change, skipping write");
        }
        Ok(result)
    }

    /// Replace the whole document.
    pub fn store(&self, doc: &T) -> Result<(), StoreError> {
        let _held = self.lock();
        self.write_unlocked(doc)
    }

    fn read_unlocked(&self) -> Result<T, StoreError> {
        match self.blobs.read(&self.name)? {
            None => Ok(T::default()),
            Some(stored) => {
                let plain = self.codec.decode(&stored)?;
                if plain.iter().all(u8::is_ascii_whitespace) {
                    return Ok(T::default());
                }
                Ok(serde_json::from_slice(&plain)?)
            }
        }
    }

    fn write_unlocked(&self, doc: &T) -> Result<(), StoreError> {
        let plain = serde_json::to_vec_pretty(doc)?;
        let stored = self.codec.encode(&plain)?;
        self.blobs.write(&self.name, &stored)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
