//! Plugin hosting
//!
//! `script` and `style` plugins are injected into rendered pages once per
//! page lifetime. `component` plugins are rendered on demand, either by a
//! compiled component from the [`ComponentRegistry`] or, for unknown keys,
//! inside an isolated QuickJS [`Sandbox`].

mod host;
mod registry;
mod sandbox;

pub use host::{InjectedElement, InjectionKind, PluginHost, Registration, SyncOutcome};
pub use registry::{Component, ComponentRegistry};
pub use sandbox::{Sandbox, TimedOutComponents};

use serde::Serialize;
use thiserror::Error;

use crate::model::ContentBlock;
use crate::render::RenderError;

/// Errors raised while registering or running a plugin
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("{0}")]
    Component(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("sandbox evaluation timed out after {0} ms")]
    Timeout(u64),

    #[error("script plugins are disabled")]
    ScriptsDisabled,

    #[error("plugin code contains a closing </{0}> tag")]
    UnsafeCode(&'static str),

    #[error("component panicked")]
    Panicked,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Base props handed to every component alongside its config
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentProps {
    pub block_id: String,
    pub block_name: String,
    pub page: String,
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

impl ComponentProps {
    pub fn for_block(block: &ContentBlock) -> Self {
        Self {
            block_id: block.id.clone(),
            block_name: block.name.clone(),
            page: block.page.clone(),
            position: block.position.clone(),
            class_name: block.metadata.as_ref().and_then(|m| m.class_name.clone()),
        }
    }
}
