//! Page content snapshots

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ContentBlock, Plugin};

/// Everything the Content Store returns for one page key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub plugins: Vec<Plugin>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl ContentSnapshot {
    /// The snapshot used whenever the store has nothing or is unreachable
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.content_blocks.is_empty() && self.plugins.is_empty() && self.settings.is_empty()
    }

    /// Decode a response body, dropping entries that fail to decode
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                tracing::warn!("Content snapshot is not valid JSON: {}", e);
                Self::empty()
            }
        }
    }

    /// Decode a JSON value entry by entry
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut root) = value else {
            tracing::warn!("Content snapshot is not a JSON object");
            return Self::empty();
        };

        let content_blocks = decode_entries::<ContentBlock>(root.remove("content_blocks"), "block");
        let plugins = decode_entries::<Plugin>(root.remove("plugins"), "plugin");
        let settings = match root.remove("settings") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self {
            content_blocks,
            plugins,
            settings,
        }
    }
}

fn decode_entries<T: serde::de::DeserializeOwned>(value: Option<Value>, kind: &str) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<T>(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping malformed {} at index {}: {}", kind, index, e);
                None
            }
        })
        .collect()
}
