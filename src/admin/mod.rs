//! Content Manager client for the superadmin CRUD endpoints
//!
//! Unlike the preview store, errors here are surfaced to the caller: the
//! operator running a CLI command needs to know that a write failed.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::model::{ContentBlock, Plugin};

const API_PREFIX: &str = "/api/superadmin";

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AdminResult<T> = Result<T, AdminError>;

/// Response of `POST /upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// Client for `/api/superadmin/*`
#[derive(Debug, Clone)]
pub struct AdminClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base_url: &str, timeout: Duration) -> AdminResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dyncontent/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Send `Authorization: Bearer {token}` with every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn block_url(&self, id: &str) -> String {
        self.url(&format!(
            "/content-blocks/{}",
            utf8_percent_encode(id, NON_ALPHANUMERIC)
        ))
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> AdminResult<Value> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AdminError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// List content blocks, optionally for one page
    pub async fn list_blocks(&self, page: Option<&str>) -> AdminResult<Vec<ContentBlock>> {
        let mut builder = self.request(reqwest::Method::GET, self.url("/content-blocks"));
        if let Some(page) = page {
            builder = builder.query(&[("page", page)]);
        }
        let body = self.send(builder).await?;
        decode_list(body, "content_blocks")
    }

    pub async fn create_block(&self, block: &ContentBlock) -> AdminResult<ContentBlock> {
        let builder = self
            .request(reqwest::Method::POST, self.url("/content-blocks"))
            .json(block);
        decode_item(self.send(builder).await?, "content_block")
    }

    /// Apply a partial update, e.g. `{"isActive": false}`
    pub async fn update_block(&self, id: &str, patch: &Value) -> AdminResult<ContentBlock> {
        let builder = self
            .request(reqwest::Method::PATCH, self.block_url(id))
            .json(patch);
        decode_item(self.send(builder).await?, "content_block")
    }

    pub async fn delete_block(&self, id: &str) -> AdminResult<()> {
        let builder = self.request(reqwest::Method::DELETE, self.block_url(id));
        self.send(builder).await?;
        Ok(())
    }

    pub async fn list_plugins(&self) -> AdminResult<Vec<Plugin>> {
        let builder = self.request(reqwest::Method::GET, self.url("/plugins"));
        decode_list(self.send(builder).await?, "plugins")
    }

    pub async fn create_plugin(&self, plugin: &Plugin) -> AdminResult<Plugin> {
        let builder = self
            .request(reqwest::Method::POST, self.url("/plugins"))
            .json(plugin);
        decode_item(self.send(builder).await?, "plugin")
    }

    /// Upload a file as multipart field `file`
    pub async fn upload(&self, path: &Path) -> AdminResult<UploadResponse> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
        let form = reqwest::multipart::Form::new().part("file", part);

        let builder = self
            .request(reqwest::Method::POST, self.url("/upload"))
            .multipart(form);
        Ok(serde_json::from_value(self.send(builder).await?)?)
    }
}

/// Accept a bare array or an object wrapping it under `key` or `data`
fn decode_list<T: DeserializeOwned>(body: Value, key: &str) -> AdminResult<Vec<T>> {
    let items = match body {
        Value::Array(_) => body,
        Value::Object(mut map) => map
            .remove(key)
            .or_else(|| map.remove("data"))
            .unwrap_or(Value::Array(Vec::new())),
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    Ok(serde_json::from_value(items)?)
}

/// Accept the entity itself or an object wrapping it under `key` or `data`
fn decode_item<T: DeserializeOwned>(body: Value, key: &str) -> AdminResult<T> {
    let item = match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or_default(),
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    };
    Ok(serde_json::from_value(item)?)
}
