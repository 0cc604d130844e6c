//! HTTP Content Store client for the superadmin preview endpoint

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{ContentStore, StoreError};
use crate::model::ContentSnapshot;

const PREVIEW_PATH: &str = "/api/superadmin/preview";

/// Fetches snapshots from `GET {base}/api/superadmin/preview?page={page}`
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentStore {
    /// Create a client; requests are never retried
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dyncontent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn preview_url(&self) -> String {
        format!("{}{}", self.base_url, PREVIEW_PATH)
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn fetch(&self, page: &str) -> Result<ContentSnapshot, StoreError> {
        let response = self
            .client
            .get(self.preview_url())
            .query(&[("page", page)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(StoreError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        Ok(ContentSnapshot::from_slice(&body))
    }

    fn describe(&self) -> String {
        self.preview_url()
    }
}
