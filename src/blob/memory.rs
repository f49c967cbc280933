//! In-memory blob store.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::BlobStore;
use crate::Result;

/// Blob store backed by a shared map. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.blobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store content under a locator, replacing any previous content.
    pub fn insert(&self, locator: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.write().insert(locator.into(), content.into());
    }

    pub fn contains(&self, locator: &str) -> bool {
        self.read().contains_key(locator)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    async fn delete(&self, locator: &str) -> Result<bool> {
        Ok(self.write().remove(locator).is_some())
    }
}
