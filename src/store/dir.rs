//! Local snapshot directory (`{dir}/{page}.json`)

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{is_valid_page_key, ContentStore, StoreError};
use crate::model::ContentSnapshot;

/// Serves snapshots from JSON files, one per page key
#[derive(Debug, Clone)]
pub struct DirContentStore {
    dir: PathBuf,
}

impl DirContentStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `page`, rejecting keys that could escape the directory
    pub fn page_path(&self, page: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_page_key(page) {
            return Err(StoreError::InvalidPage(page.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", page)))
    }
}

#[async_trait]
impl ContentStore for DirContentStore {
    async fn fetch(&self, page: &str) -> Result<ContentSnapshot, StoreError> {
        let path = self.page_path(page)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(ContentSnapshot::from_slice(&bytes))
    }

    fn describe(&self) -> String {
        format!("{}", self.dir.display())
    }
}
