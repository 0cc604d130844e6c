//! Content Store access
//!
//! A store returns the snapshot for a page key. Callers never see store
//! failures: [`fetch_or_empty`] downgrades every error to the empty snapshot.

mod cache;
mod dir;
mod http;

pub use cache::{CachedSnapshot, SnapshotCache};
pub use dir::DirContentStore;
pub use http::HttpContentStore;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::model::ContentSnapshot;

lazy_static! {
    static ref PAGE_KEY: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").unwrap();
}

/// Errors raised by a store; recovered before they reach renderers
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content store returned status {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid page key: {0:?}")]
    InvalidPage(String),
}

/// Whether `page` is a usable page key
pub fn is_valid_page_key(page: &str) -> bool {
    PAGE_KEY.is_match(page)
}

/// Source of page content snapshots
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the snapshot for `page`
    async fn fetch(&self, page: &str) -> Result<ContentSnapshot, StoreError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Fetch a snapshot, treating any failure as "no content"
pub async fn fetch_or_empty(store: &dyn ContentStore, page: &str) -> ContentSnapshot {
    match store.fetch(page).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!(
                "Content for page {:?} unavailable from {}: {}",
                page,
                store.describe(),
                e
            );
            ContentSnapshot::empty()
        }
    }
}
