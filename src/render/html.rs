//! HTML and CSS building helpers

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref CSS_PROPERTY: Regex = Regex::new(r"^-?[a-zA-Z][a-zA-Z0-9-]*$").unwrap();
    static ref CSS_UNSAFE_VALUE: Regex =
        Regex::new(r"(?i)[<>{};\\]|expression\s*\(|javascript:|vbscript:|@import").unwrap();
    static ref URL_SCHEME: Regex = Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.-]*):").unwrap();
}

/// Properties whose numeric values take no `px` suffix
const UNITLESS: &[&str] = &[
    "flex",
    "flex-grow",
    "flex-shrink",
    "font-weight",
    "line-height",
    "opacity",
    "order",
    "z-index",
    "zoom",
    "orphans",
    "widows",
    "tab-size",
    "column-count",
    "grid-row",
    "grid-column",
];

/// Escape text content
pub fn escape_text(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

/// Escape a double-quoted attribute value
pub fn escape_attr(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).into_owned()
}

/// Render ` name="value"`
pub fn attr(name: &str, value: &str) -> String {
    format!(r#" {}="{}""#, name, escape_attr(value))
}

/// Convert a camelCase style key to a CSS property name
///
/// # Examples
/// ```ignore
/// css_property("fontSize") // -> "font-size"
/// css_property("WebkitTransform") // -> "-webkit-transform"
/// ```
pub fn css_property(key: &str) -> String {
    if key.contains('-') {
        return key.to_ascii_lowercase();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// CSS value for a JSON style value, or `None` when unusable
pub fn css_value(property: &str, value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => {
            if UNITLESS.contains(&property) || n.as_f64() == Some(0.0) {
                n.to_string()
            } else {
                format!("{}px", n)
            }
        }
        _ => return None,
    };
    if rendered.is_empty() || CSS_UNSAFE_VALUE.is_match(&rendered) {
        return None;
    }
    Some(rendered)
}

/// Ordered set of CSS declarations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleMap {
    declarations: IndexMap<String, String>,
}

impl StyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a declaration, replacing an earlier value for the same property
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        self.declarations.insert(property.to_string(), value.into());
    }

    /// Merge a camelCase style object over the current declarations
    pub fn merge_json(&mut self, styles: &Map<String, Value>) {
        for (key, value) in styles {
            let property = css_property(key);
            if !CSS_PROPERTY.is_match(&property) {
                tracing::debug!("Dropping style property {:?}", key);
                continue;
            }
            match css_value(&property, value) {
                Some(v) => self.set(&property, v),
                None => tracing::debug!("Dropping unsafe value for style {:?}", key),
            }
        }
    }

    pub fn from_json(styles: &Map<String, Value>) -> Self {
        let mut map = Self::new();
        map.merge_json(styles);
        map
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Render as an inline style string
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Render as a ` style="..."` attribute, empty when there is nothing to set
    pub fn to_attr(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            attr("style", &self.to_css())
        }
    }
}

/// Whether `url` may be used in `href`/`src`
pub fn is_safe_url(url: &str) -> bool {
    let cleaned: String = url
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect();
    if cleaned.is_empty() {
        return false;
    }

    match URL_SCHEME.captures(&cleaned) {
        None => true,
        Some(caps) => {
            let scheme = caps[1].to_ascii_lowercase();
            match scheme.as_str() {
                "http" | "https" | "mailto" | "tel" => true,
                "data" => {
                    let lower = cleaned.to_ascii_lowercase();
                    lower.starts_with("data:image/") && !lower.starts_with("data:image/svg")
                }
                _ => false,
            }
        }
    }
}
