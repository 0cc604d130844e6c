//! Plugins

use serde::{Deserialize, Serialize};

use super::de;

/// Kind of behavior a plugin contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Component,
    Script,
    Style,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Component => "component",
            PluginType::Script => "script",
            PluginType::Style => "style",
        }
    }
}

/// A unit of injectable behavior scoped to a set of pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Script body, stylesheet, or component registry key
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    #[serde(
        rename = "isActive",
        alias = "is_active",
        default,
        deserialize_with = "de::bool_or_int"
    )]
    pub is_active: bool,
    /// Pages this plugin applies to; empty means every page
    #[serde(default, deserialize_with = "de::string_list")]
    pub pages: Vec<String>,
}

impl Plugin {
    pub fn new(id: &str, plugin_type: PluginType, code: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            code: code.to_string(),
            plugin_type,
            is_active: true,
            pages: Vec::new(),
        }
    }

    pub fn with_pages(mut self, pages: &[&str]) -> Self {
        self.pages = pages.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Whether this plugin applies to `page`
    pub fn is_active_for(&self, page: &str) -> bool {
        self.is_active && (self.pages.is_empty() || self.pages.iter().any(|p| p == page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pages_means_all_pages() {
        let plugin = Plugin::new("p1", PluginType::Style, "body{}");
        assert!(plugin.is_active_for("home"));
        assert!(plugin.is_active_for("crm"));
    }

    #[test]
    fn test_page_scoped_plugin() {
        let plugin = Plugin::new("p1", PluginType::Script, "").with_pages(&["home"]);
        assert!(plugin.is_active_for("home"));
        assert!(!plugin.is_active_for("crm"));

        let mut inactive = plugin.clone();
        inactive.is_active = false;
        assert!(!inactive.is_active_for("home"));
    }

    #[test]
    fn test_parse_pages_encoded_as_string() {
        let json = r#"{"id": 7, "type": "style", "isActive": "1", "pages": "[\"home\",\"crm\"]"}"#;
        let plugin: Plugin = serde_json::from_str(json).unwrap();
        assert_eq!(plugin.id, "7");
        assert!(plugin.is_active);
        assert_eq!(plugin.pages, vec!["home", "crm"]);
    }
}
