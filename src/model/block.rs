//! Content blocks

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::de;

/// Rendering strategy of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Image,
    Logo,
    Plugin,
    Custom,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Logo => "logo",
            BlockType::Plugin => "plugin",
            BlockType::Custom => "custom",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of page content addressed by (page, position)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub name: String,
    /// Type-dependent payload (`text`, `url`, `html`, `pluginId`, ...)
    #[serde(default, deserialize_with = "de::object_or_json_string")]
    pub content: Map<String, Value>,
    pub page: String,
    pub position: String,
    #[serde(
        rename = "isActive",
        alias = "is_active",
        default,
        deserialize_with = "de::bool_or_int"
    )]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BlockMetadata>,
    #[serde(
        rename = "sortOrder",
        alias = "sort_order",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sort_order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ContentBlock {
    /// Create an active block with an empty payload
    pub fn new(id: &str, block_type: BlockType, page: &str, position: &str) -> Self {
        Self {
            id: id.to_string(),
            block_type,
            name: String::new(),
            content: Map::new(),
            page: page.to_string(),
            position: position.to_string(),
            is_active: true,
            metadata: None,
            sort_order: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder-style payload setter
    pub fn with_content(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.content.insert(key.to_string(), value.into());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Get a string payload field
    pub fn content_str(&self, key: &str) -> Option<&str> {
        self.content.get(key).and_then(Value::as_str)
    }

    pub fn content_value(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    pub fn responsive(&self) -> Option<&Responsive> {
        self.metadata.as_ref().and_then(|m| m.responsive.as_ref())
    }
}

/// Presentation metadata attached to a block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// CSS properties keyed by camelCase name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsive: Option<Responsive>,
}

/// Per-breakpoint visibility flags; `None` means visible
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsive {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desktop: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        let json = r#"{
            "id": "1",
            "type": "text",
            "name": "hero",
            "page": "home",
            "position": "hero-title",
            "isActive": true,
            "content": {"text": "<h1>Hi</h1>", "tag": "div"},
            "metadata": {"className": "hero", "responsive": {"mobile": false}}
        }"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type, BlockType::Text);
        assert_eq!(block.content_str("text"), Some("<h1>Hi</h1>"));
        assert!(block.is_active);
        let metadata = block.metadata.as_ref().unwrap();
        assert_eq!(metadata.class_name.as_deref(), Some("hero"));
        assert_eq!(block.responsive().unwrap().mobile, Some(false));
        assert_eq!(block.responsive().unwrap().tablet, None);
    }

    #[test]
    fn test_parse_loose_backend_values() {
        let json = r#"{
            "id": 42,
            "type": "custom",
            "page": "home",
            "position": "footer",
            "is_active": 1,
            "content": "{\"html\": \"<p>x</p>\"}"
        }"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.id, "42");
        assert!(block.is_active);
        assert_eq!(block.content_str("html"), Some("<p>x</p>"));
    }

    #[test]
    fn test_missing_active_flag_is_inactive() {
        let json = r#"{"id": "1", "type": "logo", "page": "p", "position": "s"}"#;
        let block: ContentBlock = serde_json::from_str(json).unwrap();
        assert!(!block.is_active);
        assert!(block.content.is_empty());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"id": "1", "type": "video", "page": "p", "position": "s"}"#;
        assert!(serde_json::from_str::<ContentBlock>(json).is_err());
    }
}
