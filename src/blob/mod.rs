//! Blob storage seam.
//!
//! File content lives outside the item store and is addressed by an opaque
//! locator. The store only ever asks for content to be released: after a
//! permanent delete commits, the removed files' locators are handed to a
//! [`BlobReclaimer`], which deletes them in the background.

mod local;
mod memory;
mod reclaimer;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use reclaimer::{BlobReclaimer, ReclaimStats};

use std::future::Future;

use crate::Result;

/// Deletion interface of an external blob store.
pub trait BlobStore: Clone + Send + Sync + 'static {
    /// Delete the blob behind `locator`.
    ///
    /// Returns `true` if a blob was removed, `false` if none existed.
    fn delete(&self, locator: &str) -> impl Future<Output = Result<bool>> + Send;
}
