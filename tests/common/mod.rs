//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use cloudshelf::{
    BlobReclaimer, Database, MediaType, MemoryBlobStore, NewFile, NewUser, UserRepository,
};

/// A file-backed store with a running reclaimer.
pub struct TestStore {
    pub db: Arc<Database>,
    pub reclaimer: Arc<BlobReclaimer>,
    pub blobs: MemoryBlobStore,
    _dir: TempDir,
}

impl TestStore {
    /// Open a fresh store in a temporary directory.
    pub async fn open() -> Self {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("shelf.db"), 8).await.unwrap();
        let blobs = MemoryBlobStore::new();
        let reclaimer = BlobReclaimer::spawn(blobs.clone());
        Self {
            db: Arc::new(db),
            reclaimer: Arc::new(reclaimer),
            blobs,
            _dir: dir,
        }
    }

    /// Register a user and return its ID.
    pub async fn user(&self, email: &str, name: &str) -> String {
        UserRepository::new(self.db.pool())
            .create(&NewUser::new(email, name))
            .await
            .unwrap()
            .id
    }
}

/// A PDF payload whose locator is derived from its name.
pub fn pdf(name: &str, size: u64) -> NewFile {
    NewFile::new(name, format!("blob-{name}"), MediaType::Pdf, size)
}
