//! Closed registry of compiled component plugins

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::{ComponentProps, PluginError};
use crate::render::html::{attr, escape_text, is_safe_url};

/// A component plugin compiled into the binary
pub trait Component: Send + Sync {
    fn render(&self, config: &Value, props: &ComponentProps) -> Result<String, PluginError>;
}

impl<F> Component for F
where
    F: Fn(&Value, &ComponentProps) -> Result<String, PluginError> + Send + Sync,
{
    fn render(&self, config: &Value, props: &ComponentProps) -> Result<String, PluginError> {
        self(config, props)
    }
}

/// Components selectable by the key stored in a plugin's `code`
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in components
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("announcement-banner", announcement_banner);
        registry.register("stat-counter", stat_counter);
        registry.register("call-to-action", call_to_action);
        registry.register("link-list", link_list);
        registry
    }

    pub fn register<C: Component + 'static>(&mut self, key: &str, component: C) {
        self.components.insert(key.to_string(), Arc::new(component));
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Component>> {
        self.components.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.components.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.components.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.keys())
            .finish()
    }
}

fn config_str<'a>(config: &'a Value, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn required<'a>(config: &'a Value, key: &str) -> Result<&'a str, PluginError> {
    config_str(config, key)
        .ok_or_else(|| PluginError::Component(format!("missing config field `{}`", key)))
}

fn safe_href<'a>(config: &'a Value, key: &str) -> Result<&'a str, PluginError> {
    let href = required(config, key)?;
    if !is_safe_url(href) {
        return Err(PluginError::Component(format!("unsafe link `{}`", href)));
    }
    Ok(href)
}

fn announcement_banner(config: &Value, props: &ComponentProps) -> Result<String, PluginError> {
    let message = required(config, "message")?;
    let tone = match config_str(config, "tone") {
        Some(t @ ("info" | "success" | "warning" | "danger")) => t,
        _ => "info",
    };

    let link = match config_str(config, "link") {
        Some(_) => {
            let href = safe_href(config, "link")?;
            let text = config_str(config, "linkText").unwrap_or("Learn more");
            format!(
                r#" <a{} class="dc-banner-link">{}</a>"#,
                attr("href", href),
                escape_text(text)
            )
        }
        None => String::new(),
    };

    Ok(format!(
        r#"<div class="dc-banner dc-banner-{}" role="status"{}><span>{}</span>{}</div>"#,
        tone,
        attr("data-position", &props.position),
        escape_text(message),
        link
    ))
}

fn stat_counter(config: &Value, _props: &ComponentProps) -> Result<String, PluginError> {
    let label = required(config, "label")?;
    let value = match config.get("value") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => {
            return Err(PluginError::Component(
                "missing config field `value`".to_string(),
            ))
        }
    };
    let prefix = config_str(config, "prefix").unwrap_or("");
    let suffix = config_str(config, "suffix").unwrap_or("");

    Ok(format!(
        r#"<div class="dc-stat"><span class="dc-stat-value">{}{}{}</span><span class="dc-stat-label">{}</span></div>"#,
        escape_text(prefix),
        escape_text(&value),
        escape_text(suffix),
        escape_text(label)
    ))
}

fn call_to_action(config: &Value, _props: &ComponentProps) -> Result<String, PluginError> {
    let text = required(config, "text")?;
    let href = safe_href(config, "href")?;
    let variant = match config_str(config, "variant") {
        Some("secondary") => "secondary",
        _ => "primary",
    };

    Ok(format!(
        r#"<a{} class="dc-cta dc-cta-{}">{}</a>"#,
        attr("href", href),
        variant,
        escape_text(text)
    ))
}

fn link_list(config: &Value, _props: &ComponentProps) -> Result<String, PluginError> {
    let links = config
        .get("links")
        .and_then(Value::as_array)
        .ok_or_else(|| PluginError::Component("missing config field `links`".to_string()))?;

    let mut items = Vec::with_capacity(links.len());
    for link in links {
        let label = required(link, "label")?;
        let href = safe_href(link, "href")?;
        items.push(format!(
            "<li><a{}>{}</a></li>",
            attr("href", href),
            escape_text(label)
        ));
    }

    let title = config_str(config, "title")
        .map(|t| format!("<h3>{}</h3>", escape_text(t)))
        .unwrap_or_default();

    Ok(format!(
        r#"<nav class="dc-link-list">{}<ul>{}</ul></nav>"#,
        title,
        items.join("")
    ))
}
