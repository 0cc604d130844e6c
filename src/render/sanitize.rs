//! Allow-list markup sanitizer for editor-authored HTML
//!
//! Elements that can execute or load active content are removed together with
//! their content. Other unknown elements are unwrapped so their text survives.
//! Event handler attributes and unsafe URLs are stripped.

use lazy_static::lazy_static;
use lol_html::{doc_comments, element, rewrite_str, RewriteStrSettings};
use regex::Regex;

use super::html::{css_value, is_safe_url};
use super::RenderError;

lazy_static! {
    static ref ATTRIBUTE_NAME: Regex = Regex::new(r"^[a-zA-Z_][-a-zA-Z0-9_:.]*$").unwrap();
}

const REMOVE_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "frame", "frameset", "object", "embed", "applet", "base",
    "link", "meta", "noscript", "template", "form", "input", "button", "textarea", "select",
    "option", "svg", "math", "title", "head",
];

const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "article", "aside", "b", "blockquote", "br", "caption", "cite", "code",
    "col", "colgroup", "dd", "del", "details", "div", "dl", "dt", "em", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "i", "img",
    "ins", "kbd", "label", "li", "main", "mark", "nav", "ol", "p", "picture", "pre", "q",
    "s", "section", "small", "source", "span", "strong", "sub", "summary", "sup", "table",
    "tbody", "td", "tfoot", "th", "thead", "time", "tr", "u", "ul", "video", "audio",
];

const URL_ATTRIBUTES: &[&str] = &["href", "src", "cite", "poster", "srcset", "background"];

const FORBIDDEN_ATTRIBUTES: &[&str] = &["srcdoc", "formaction", "action", "xmlns", "is"];

/// Whether an attribute may stay on an allowed element
fn attribute_allowed(name: &str, value: &str) -> bool {
    if !ATTRIBUTE_NAME.is_match(name) || name.starts_with("on") {
        return false;
    }
    if FORBIDDEN_ATTRIBUTES.contains(&name) || name.contains(':') {
        return false;
    }
    if URL_ATTRIBUTES.contains(&name) {
        return if name == "srcset" {
            value
                .split(',')
                .filter_map(|candidate| candidate.split_whitespace().next())
                .all(is_safe_url)
        } else {
            is_safe_url(value)
        };
    }
    if name == "style" {
        return value.split(';').all(|declaration| {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                return true;
            }
            match declaration.split_once(':') {
                Some((property, v)) => {
                    css_value(property.trim(), &serde_json::Value::String(v.to_string())).is_some()
                }
                None => false,
            }
        });
    }
    true
}

/// Sanitize a markup fragment
pub fn sanitize_html(input: &str) -> Result<String, RenderError> {
    let output = rewrite_str(
        input,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name().to_ascii_lowercase();
                if REMOVE_WITH_CONTENT.contains(&tag.as_str()) {
                    el.remove();
                    return Ok(());
                }
                if !ALLOWED_TAGS.contains(&tag.as_str()) {
                    el.remove_and_keep_content();
                    return Ok(());
                }

                let rejected: Vec<String> = el
                    .attributes()
                    .iter()
                    .filter(|a| !attribute_allowed(&a.name().to_ascii_lowercase(), &a.value()))
                    .map(|a| a.name())
                    .collect();
                for name in rejected {
                    el.remove_attribute(&name);
                }

                if tag == "a" && el.get_attribute("target").as_deref() == Some("_blank") {
                    el.set_attribute("rel", "noopener noreferrer")?;
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_comments!(|c| {
                c.remove();
                Ok(())
            })],
            ..RewriteStrSettings::new()
        },
    )
    .map_err(|e| RenderError::Sanitize(e.to_string()))?;

    Ok(output)
}
