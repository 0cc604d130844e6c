//! Content service - store access through the snapshot cache

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::ContentConfig;
use crate::store::{
    fetch_or_empty, CachedSnapshot, ContentStore, DirContentStore, HttpContentStore,
    SnapshotCache,
};

/// Shared entry point for loading page snapshots
#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    cache: Arc<SnapshotCache>,
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>, stale_after: Duration) -> Self {
        Self {
            store,
            cache: Arc::new(SnapshotCache::new(stale_after)),
        }
    }

    /// Build the service for a configuration: a local content directory
    /// when one is set, the HTTP API otherwise
    pub fn from_config(config: &ContentConfig, base_dir: &Path) -> Result<Self> {
        let store: Arc<dyn ContentStore> = match &config.content_dir {
            Some(dir) => {
                let dir = if dir.is_absolute() {
                    dir.clone()
                } else {
                    base_dir.join(dir)
                };
                Arc::new(DirContentStore::new(dir))
            }
            None => Arc::new(HttpContentStore::new(
                &config.api_base_url,
                config.store.timeout(),
            )?),
        };
        tracing::debug!("Using content store {}", store.describe());
        Ok(Self::new(store, config.store.stale_after()))
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    /// Snapshot for `page`, from cache while fresh; never fails
    pub async fn snapshot(&self, page: &str) -> CachedSnapshot {
        load_through(self.store.as_ref(), &self.cache, page).await
    }

    /// Fetch `page` again regardless of the cache
    pub async fn refresh(&self, page: &str) -> CachedSnapshot {
        let snapshot = fetch_or_empty(self.store.as_ref(), page).await;
        self.cache.insert(page, snapshot).await
    }

    /// Start loading `page` in the background
    ///
    /// Dropping the returned handle cancels the load, so a view that goes
    /// away never receives a late snapshot.
    pub fn load(&self, page: &str) -> PageLoad {
        let store = Arc::clone(&self.store);
        let cache = Arc::clone(&self.cache);
        let key = page.to_string();
        let handle = tokio::spawn(async move { load_through(store.as_ref(), &cache, &key).await });
        PageLoad {
            page: page.to_string(),
            handle,
        }
    }
}

async fn load_through(store: &dyn ContentStore, cache: &SnapshotCache, page: &str) -> CachedSnapshot {
    if let Some(cached) = cache.get_fresh(page).await {
        tracing::debug!("Using cached snapshot v{} for {:?}", cached.version, page);
        return cached;
    }
    let snapshot = fetch_or_empty(store, page).await;
    cache.insert(page, snapshot).await
}

/// An in-flight page load, aborted when dropped
#[derive(Debug)]
pub struct PageLoad {
    page: String,
    handle: JoinHandle<CachedSnapshot>,
}

impl PageLoad {
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Wait for the snapshot; `None` if the load was cancelled
    pub async fn wait(mut self) -> Option<CachedSnapshot> {
        (&mut self.handle).await.ok()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PageLoad {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!("Cancelling load of {:?}", self.page);
        }
        self.handle.abort();
    }
}
