//! Per-page snapshot cache with a staleness window

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::model::ContentSnapshot;

/// A snapshot with the version it was stored under
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    /// Increases with every insert, across pages
    pub version: u64,
    pub snapshot: Arc<ContentSnapshot>,
    pub fetched_at: Instant,
}

/// Snapshots keyed by page, reused until they are older than `stale_after`
#[derive(Debug)]
pub struct SnapshotCache {
    stale_after: Duration,
    entries: RwLock<HashMap<String, CachedSnapshot>>,
    next_version: AtomicU64,
}

impl SnapshotCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            entries: RwLock::new(HashMap::new()),
            next_version: AtomicU64::new(1),
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// The cached snapshot for `page` if it is still within the window
    pub async fn get_fresh(&self, page: &str) -> Option<CachedSnapshot> {
        let entries = self.entries.read().await;
        entries
            .get(page)
            .filter(|entry| entry.fetched_at.elapsed() < self.stale_after)
            .cloned()
    }

    /// Store a snapshot under a new version
    ///
    /// The version is allocated under the write lock, so the stored entry
    /// always carries the highest version handed out for its page.
    pub async fn insert(&self, page: &str, snapshot: ContentSnapshot) -> CachedSnapshot {
        let mut entries = self.entries.write().await;
        let entry = CachedSnapshot {
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
            snapshot: Arc::new(snapshot),
            fetched_at: Instant::now(),
        };
        entries.insert(page.to_string(), entry.clone());
        entry
    }

    pub async fn invalidate(&self, page: &str) {
        self.entries.write().await.remove(page);
    }

    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        tracing::debug!("Invalidating {} cached snapshots", entries.len());
        entries.clear();
    }

    /// Page keys currently cached, fresh or not
    pub async fn pages(&self) -> Vec<String> {
        let mut pages: Vec<String> = self.entries.read().await.keys().cloned().collect();
        pages.sort();
        pages
    }
}
