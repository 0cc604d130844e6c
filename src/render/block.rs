//! Per-type block rendering with per-block fault isolation

use serde_json::{Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::html::{attr, css_value, escape_text, is_safe_url, StyleMap};
use super::{sanitize_html, RenderError};
use crate::model::{BlockType, ContentBlock, Plugin, PluginType};
use crate::plugin::{ComponentProps, PluginError, PluginHost};
use crate::visibility::{hidden_classes, Viewport};

/// Container tags a `text` block may ask for
const TEXT_TAGS: &[&str] = &[
    "div", "span", "p", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "header",
    "footer", "aside", "blockquote", "strong", "em", "small", "label", "li", "ul", "ol",
    "nav", "main", "figure", "figcaption",
];

const OBJECT_FIT: &[&str] = &["cover", "contain", "fill", "none", "scale-down"];

/// Placeholder for a block whose rendering failed
pub fn error_placeholder(block: &ContentBlock) -> String {
    format!(
        r#"<div class="dynamic-content-error"{}>Error rendering content</div>"#,
        attr("data-block-id", &block.id)
    )
}

/// Placeholder for a plugin block whose plugin is not available on this page
pub fn plugin_missing_placeholder(plugin_id: &str) -> String {
    format!(
        r#"<div class="dynamic-content-plugin-missing"{}>Plugin not found: {}</div>"#,
        attr("data-plugin-id", plugin_id),
        escape_text(plugin_id)
    )
}

/// Placeholder for a component plugin that failed while rendering
pub fn plugin_error_placeholder(plugin_id: &str, error: &PluginError) -> String {
    format!(
        r#"<div class="dynamic-content-plugin-error"{}>Plugin Error: {}</div>"#,
        attr("data-plugin-id", plugin_id),
        escape_text(&error.to_string())
    )
}

/// Renders blocks for one page
pub struct BlockRenderer<'a> {
    plugins: Vec<&'a Plugin>,
    host: &'a PluginHost,
    sanitize: bool,
    viewport: Viewport,
}

impl<'a> BlockRenderer<'a> {
    /// `plugins` must already be resolved for the page being rendered
    pub fn new(plugins: Vec<&'a Plugin>, host: &'a PluginHost, sanitize: bool) -> Self {
        Self {
            plugins,
            host,
            sanitize,
            viewport: Viewport::Unknown,
        }
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Render every block; a failing block becomes an error placeholder
    /// and never affects its siblings
    pub fn render_blocks(&self, blocks: &[&ContentBlock]) -> Vec<String> {
        blocks
            .iter()
            .map(|block| match catch_unwind(AssertUnwindSafe(|| self.render_block(block))) {
                Ok(Ok(html)) => html,
                Ok(Err(e)) => {
                    tracing::warn!(block_id = %block.id, "Failed to render block: {}", e);
                    error_placeholder(block)
                }
                Err(_) => {
                    tracing::warn!(block_id = %block.id, "Block renderer panicked");
                    error_placeholder(block)
                }
            })
            .collect()
    }

    /// Render one block inside its wrapper element
    pub fn render_block(&self, block: &ContentBlock) -> Result<String, RenderError> {
        let body = match block.block_type {
            BlockType::Text => self.render_text(block)?,
            BlockType::Image => self.render_image(block)?,
            BlockType::Logo => self.render_logo(block)?,
            BlockType::Custom => self.render_custom(block)?,
            BlockType::Plugin => self.render_plugin(block)?,
        };
        Ok(self.wrap(block, &body))
    }

    fn wrap(&self, block: &ContentBlock, body: &str) -> String {
        let mut classes = vec!["dynamic-content-block".to_string()];
        let mut style = StyleMap::new();

        if let Some(metadata) = &block.metadata {
            if let Some(class_name) = metadata.class_name.as_deref().map(str::trim) {
                if !class_name.is_empty() {
                    classes.push(class_name.to_string());
                }
            }
            if let Some(styles) = &metadata.style {
                style.merge_json(styles);
            }
        }
        if self.viewport == Viewport::Unknown {
            classes.extend(hidden_classes(block));
        }

        format!(
            "<div{}{}{}{}>{}</div>",
            attr("class", &classes.join(" ")),
            attr("data-block-id", &block.id),
            attr("data-block-type", block.block_type.as_str()),
            style.to_attr(),
            body
        )
    }

    fn markup(&self, html: &str) -> Result<String, RenderError> {
        if self.sanitize {
            sanitize_html(html)
        } else {
            Ok(html.to_string())
        }
    }

    fn render_text(&self, block: &ContentBlock) -> Result<String, RenderError> {
        let text = required_str(block, "text")?;
        let tag = block.content_str("tag").unwrap_or("div").trim().to_ascii_lowercase();
        if !TEXT_TAGS.contains(&tag.as_str()) {
            return Err(RenderError::DisallowedTag(tag));
        }

        let mut style = StyleMap::new();
        match block.content_value("styling") {
            None | Some(Value::Null) => {}
            Some(Value::Object(styling)) => style.merge_json(styling),
            Some(_) => {
                return Err(RenderError::InvalidField {
                    block: block.id.clone(),
                    field: "styling",
                    reason: "expected an object".to_string(),
                })
            }
        }

        Ok(format!(
            "<{tag}{}>{}</{tag}>",
            style.to_attr(),
            self.markup(text)?,
            tag = tag
        ))
    }

    fn render_image(&self, block: &ContentBlock) -> Result<String, RenderError> {
        let url = safe_url(block, "url")?;
        let alt = block.content_str("alt").unwrap_or("");
        let object_fit = block
            .content_str("objectFit")
            .filter(|fit| OBJECT_FIT.contains(fit))
            .unwrap_or("cover");

        let mut style = StyleMap::new();
        style.set("max-width", "100%");
        style.set("object-fit", object_fit);
        let dimensions = dimensions(block, &mut style, None)?;

        Ok(format!(
            r#"<img{}{}{} loading="lazy"{}>"#,
            attr("src", url),
            attr("alt", alt),
            dimensions,
            style.to_attr()
        ))
    }

    fn render_logo(&self, block: &ContentBlock) -> Result<String, RenderError> {
        let url = safe_url(block, "url")?;
        let alt = block.content_str("alt").unwrap_or("Logo");

        let mut style = StyleMap::new();
        let dimensions = dimensions(block, &mut style, Some(48))?;
        let img = format!(
            r#"<img{}{}{} loading="eager"{}>"#,
            attr("src", url),
            attr("alt", alt),
            dimensions,
            style.to_attr()
        );

        match block.content_str("link").map(str::trim).filter(|l| !l.is_empty()) {
            Some(link) => {
                if !is_safe_url(link) {
                    return Err(RenderError::UnsafeUrl(link.to_string()));
                }
                Ok(format!(
                    r#"<a{} class="dynamic-content-logo-link">{}</a>"#,
                    attr("href", link),
                    img
                ))
            }
            None => Ok(img),
        }
    }

    fn render_custom(&self, block: &ContentBlock) -> Result<String, RenderError> {
        self.markup(required_str(block, "html")?)
    }

    fn render_plugin(&self, block: &ContentBlock) -> Result<String, RenderError> {
        let plugin_id = match block.content_value("pluginId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) => {
                return Err(RenderError::MissingField {
                    block: block.id.clone(),
                    field: "pluginId",
                })
            }
            Some(_) => {
                return Err(RenderError::InvalidField {
                    block: block.id.clone(),
                    field: "pluginId",
                    reason: "expected a string".to_string(),
                })
            }
        };

        let Some(plugin) = self
            .plugins
            .iter()
            .find(|p| p.id == plugin_id && p.plugin_type == PluginType::Component)
        else {
            tracing::debug!(block_id = %block.id, "Plugin {} not found", plugin_id);
            return Ok(plugin_missing_placeholder(&plugin_id));
        };

        let config = block
            .content_value("config")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let props = ComponentProps::for_block(block);

        match self.host.render_component(plugin, &config, &props) {
            Ok(html) => Ok(html),
            Err(e) => {
                tracing::warn!(block_id = %block.id, plugin_id = %plugin_id, "Plugin failed: {}", e);
                Ok(plugin_error_placeholder(&plugin_id, &e))
            }
        }
    }
}

fn required_str<'b>(block: &'b ContentBlock, field: &'static str) -> Result<&'b str, RenderError> {
    match block.content_value(field) {
        Some(Value::String(s)) => Ok(s),
        None | Some(Value::Null) => Err(RenderError::MissingField {
            block: block.id.clone(),
            field,
        }),
        Some(_) => Err(RenderError::InvalidField {
            block: block.id.clone(),
            field,
            reason: "expected a string".to_string(),
        }),
    }
}

fn safe_url<'b>(block: &'b ContentBlock, field: &'static str) -> Result<&'b str, RenderError> {
    let url = required_str(block, field)?.trim();
    if !is_safe_url(url) {
        return Err(RenderError::UnsafeUrl(url.to_string()));
    }
    Ok(url)
}

/// `width`/`height` as attributes when integral, otherwise as CSS
fn dimensions(
    block: &ContentBlock,
    style: &mut StyleMap,
    default: Option<u64>,
) -> Result<String, RenderError> {
    let mut attrs = String::new();
    for field in ["width", "height"] {
        match block.content_value(field) {
            None | Some(Value::Null) => {
                if let Some(value) = default {
                    attrs.push_str(&attr(field, &value.to_string()));
                }
            }
            Some(Value::Number(n)) if n.as_u64().is_some() => {
                attrs.push_str(&attr(field, &n.to_string()));
            }
            Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
                attrs.push_str(&attr(field, s));
            }
            Some(value) => match css_value(field, value) {
                Some(css) => style.set(field, css),
                None => {
                    return Err(RenderError::InvalidField {
                        block: block.id.clone(),
                        field,
                        reason: format!("unusable dimension {}", value),
                    })
                }
            },
        }
    }
    Ok(attrs)
}
