//! Background blob reclamation.
//!
//! Permanent deletes commit first and then hand their locators to the
//! reclaimer. Deletion failures are logged and counted; they never affect
//! the metadata that was already removed.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::BlobStore;

/// Outcome counters of a reclaimer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimStats {
    /// Blobs removed.
    pub deleted: u64,
    /// Locators with no blob behind them.
    pub missing: u64,
    /// Deletions that failed.
    pub failed: u64,
}

/// Handle to the background reclamation task.
pub struct BlobReclaimer {
    sender: mpsc::UnboundedSender<String>,
    worker: JoinHandle<ReclaimStats>,
}

impl BlobReclaimer {
    /// Spawn the reclamation task on the current tokio runtime.
    pub fn spawn<B: BlobStore>(store: B) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run(store, receiver));
        Self { sender, worker }
    }

    /// Queue locators for deletion. Never blocks.
    pub fn release(&self, locators: Vec<String>) {
        if locators.is_empty() {
            return;
        }
        debug!("Queueing {} blob(s) for reclamation", locators.len());

        for locator in locators {
            if let Err(e) = self.sender.send(locator) {
                warn!("Blob reclaimer stopped; dropping locator {}", e.0);
            }
        }
    }

    /// Stop accepting locators, drain the queue and return the counters.
    pub async fn shutdown(self) -> ReclaimStats {
        drop(self.sender);
        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Blob reclaimer task failed: {}", e);
                ReclaimStats::default()
            }
        }
    }
}

impl std::fmt::Debug for BlobReclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReclaimer").finish()
    }
}

async fn run<B: BlobStore>(store: B, mut receiver: mpsc::UnboundedReceiver<String>) -> ReclaimStats {
    info!("Blob reclaimer started");
    let mut stats = ReclaimStats::default();

    while let Some(locator) = receiver.recv().await {
        match store.delete(&locator).await {
            Ok(true) => stats.deleted += 1,
            Ok(false) => {
                debug!("Blob {} was already gone", locator);
                stats.missing += 1;
            }
            Err(e) => {
                warn!("Failed to delete blob {}: {}", locator, e);
                stats.failed += 1;
            }
        }
    }

    info!(
        "Blob reclaimer stopped ({} deleted, {} missing, {} failed)",
        stats.deleted, stats.missing, stats.failed
    );
    stats
}
