//! Filesystem blob store.
//!
//! Blobs are laid out in shard directories named after the first two
//! characters of the locator:
//! ```text
//! {root}/
//! ├── ab/
//! │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
//! └── cd/
//!     └── cd90ab12-3456-7890-abcd-ef1234567890.png
//! ```
//! Uploads are written by the transfer layer; this adapter only resolves
//! and deletes.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::BlobStore;
use crate::{Result, ShelfError};

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, creating the directory if missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a locator to its path under the root.
    ///
    /// Locators are single path components; anything that could escape the
    /// root is rejected.
    pub fn path_for(&self, locator: &str) -> Result<PathBuf> {
        if locator.is_empty()
            || locator.starts_with('.')
            || locator.contains(['/', '\\'])
            || locator.contains('\0')
        {
            return Err(ShelfError::Validation(format!(
                "locator: invalid blob locator {locator:?}"
            )));
        }

        let shard: String = locator.chars().take(2).collect();
        Ok(self.root.join(shard).join(locator))
    }

    /// Remove empty shard directories. Returns how many were removed.
    pub async fn cleanup_empty_shards(&self) -> Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            // remove_dir fails on non-empty directories.
            if tokio::fs::remove_dir(&path).await.is_ok() {
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl BlobStore for LocalBlobStore {
    async fn delete(&self, locator: &str) -> Result<bool> {
        let path = self.path_for(locator)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted blob {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, LocalBlobStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path().join("blobs")).unwrap();
        (temp_dir, store)
    }

    fn write_blob(store: &LocalBlobStore, locator: &str) -> PathBuf {
        let path = store.path_for(locator).unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"content").unwrap();
        path
    }

    #[test]
    fn test_new_creates_root() {
        let (_temp_dir, store) = setup_store();
        assert!(store.root().is_dir());
    }

    #[test]
    fn test_path_for_uses_shard() {
        let (_temp_dir, store) = setup_store();
        let path = store.path_for("ab12cd.pdf").unwrap();
        assert_eq!(path, store.root().join("ab").join("ab12cd.pdf"));
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let (_temp_dir, store) = setup_store();
        for locator in ["", "../etc/passwd", "a/b", "a\\b", ".hidden"] {
            assert!(
                matches!(store.path_for(locator), Err(ShelfError::Validation(_))),
                "accepted {locator:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let (_temp_dir, store) = setup_store();
        let path = write_blob(&store, "cd90ab.png");

        assert!(store.delete("cd90ab.png").await.unwrap());
        assert!(!path.exists());
        assert!(!store.delete("cd90ab.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_empty_shards() {
        let (_temp_dir, store) = setup_store();
        write_blob(&store, "aa11.bin");
        write_blob(&store, "bb22.bin");
        store.delete("aa11.bin").await.unwrap();

        assert_eq!(store.cleanup_empty_shards().await.unwrap(), 1);
        assert!(!store.root().join("aa").exists());
        assert!(store.root().join("bb").exists());
    }
}
