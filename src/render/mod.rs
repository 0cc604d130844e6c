//! Block rendering - turns resolved content blocks into HTML fragments

mod block;
pub mod html;
mod sanitize;

pub use block::{
    error_placeholder, plugin_error_placeholder, plugin_missing_placeholder, BlockRenderer,
};
pub use sanitize::sanitize_html;

use thiserror::Error;

/// Failure to render a single block
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("block {block} is missing content field `{field}`")]
    MissingField { block: String, field: &'static str },

    #[error("block {block} has invalid content field `{field}`: {reason}")]
    InvalidField {
        block: String,
        field: &'static str,
        reason: String,
    },

    #[error("tag <{0}> is not allowed for text blocks")]
    DisallowedTag(String),

    #[error("unsafe URL: {0}")]
    UnsafeUrl(String),

    #[error("sanitizer error: {0}")]
    Sanitize(String),
}
