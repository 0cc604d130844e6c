//! Page content view - resolved blocks for one page with loading state,
//! fallback handling and a plugin host scoped to the view's lifetime

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{ContentConfig, VisibilityConfig};
use crate::model::{ContentBlock, ContentSnapshot, Plugin};
use crate::plugin::{ComponentRegistry, PluginHost, SyncOutcome, TimedOutComponents};
use crate::render::BlockRenderer;
use crate::resolver::{find_block_by_name, positions, resolve_blocks, resolve_plugins};
use crate::store::CachedSnapshot;
use crate::visibility::{is_visible_in, responsive_stylesheet, Viewport};

/// Loading state of a page view
#[derive(Debug, Clone)]
pub enum LoadState {
    Loading,
    Ready {
        version: u64,
        snapshot: Arc<ContentSnapshot>,
    },
}

/// Dynamic content of a single page
#[derive(Debug)]
pub struct PageContent {
    page: String,
    state: LoadState,
    host: PluginHost,
    viewport: Viewport,
    bounds: VisibilityConfig,
    sanitize: bool,
}

impl PageContent {
    /// A view that is still loading
    pub fn new(page: &str, config: &ContentConfig) -> Self {
        Self::with_host(
            page,
            config,
            PluginHost::new(&config.plugins, config.render.sanitize_markup),
        )
    }

    pub fn with_registry(
        page: &str,
        config: &ContentConfig,
        registry: Arc<ComponentRegistry>,
    ) -> Self {
        Self::with_host(
            page,
            config,
            PluginHost::with_registry(&config.plugins, config.render.sanitize_markup, registry),
        )
    }

    fn with_host(page: &str, config: &ContentConfig, host: PluginHost) -> Self {
        Self {
            page: page.to_string(),
            state: LoadState::Loading,
            host,
            viewport: Viewport::Unknown,
            bounds: config.visibility,
            sanitize: config.render.sanitize_markup,
        }
    }

    /// Share the record of timed-out sandboxed components across views
    pub fn with_timed_out(mut self, timed_out: TimedOutComponents) -> Self {
        self.host = self.host.with_timed_out(timed_out);
        self
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    /// Apply a snapshot observed at `version`; older versions are ignored
    ///
    /// Returns whether the snapshot was applied.
    pub fn apply(&mut self, version: u64, snapshot: Arc<ContentSnapshot>) -> bool {
        if let LoadState::Ready { version: current, .. } = &self.state {
            if version < *current {
                tracing::debug!(
                    "Ignoring snapshot v{} for {:?} (showing v{})",
                    version,
                    self.page,
                    current
                );
                return false;
            }
        }

        let plugins = resolve_plugins(&snapshot.plugins, &self.page);
        if let SyncOutcome::Stale { .. } = self.host.sync(version, &plugins) {
            return false;
        }
        self.state = LoadState::Ready { version, snapshot };
        true
    }

    pub fn apply_cached(&mut self, cached: CachedSnapshot) -> bool {
        self.apply(cached.version, cached.snapshot)
    }

    /// Change the viewport; the next render re-filters
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn snapshot(&self) -> Option<&ContentSnapshot> {
        match &self.state {
            LoadState::Loading => None,
            LoadState::Ready { snapshot, .. } => Some(snapshot.as_ref()),
        }
    }

    /// Active blocks for `position` (or the whole page), before visibility
    pub fn resolved(&self, position: Option<&str>) -> Vec<&ContentBlock> {
        self.snapshot()
            .map(|s| resolve_blocks(&s.content_blocks, &self.page, position))
            .unwrap_or_default()
    }

    /// Active blocks for `position` that are visible in the current viewport
    pub fn blocks(&self, position: Option<&str>) -> Vec<&ContentBlock> {
        self.resolved(position)
            .into_iter()
            .filter(|b| is_visible_in(b, self.viewport, &self.bounds))
            .collect()
    }

    pub fn block_by_name(&self, name: &str) -> Option<&ContentBlock> {
        self.snapshot()
            .and_then(|s| find_block_by_name(&s.content_blocks, &self.page, name))
    }

    pub fn plugins(&self) -> Vec<&Plugin> {
        self.snapshot()
            .map(|s| resolve_plugins(&s.plugins, &self.page))
            .unwrap_or_default()
    }

    pub fn positions(&self) -> Vec<&str> {
        self.snapshot()
            .map(|s| positions(&s.content_blocks, &self.page))
            .unwrap_or_default()
    }

    pub fn settings(&self) -> Option<&Map<String, Value>> {
        self.snapshot().map(|s| &s.settings)
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings().and_then(|s| s.get(key))
    }

    /// Render a position
    ///
    /// While loading, or when no active block resolves, the output is exactly
    /// `fallback` (empty without one). Otherwise it is the visible blocks only.
    pub fn render_position(&self, position: &str, fallback: Option<&str>) -> String {
        let fallback = fallback.unwrap_or_default().to_string();
        if self.is_loading() {
            return fallback;
        }
        let resolved = self.resolved(Some(position));
        if resolved.is_empty() {
            return fallback;
        }

        let visible: Vec<&ContentBlock> = resolved
            .into_iter()
            .filter(|b| is_visible_in(b, self.viewport, &self.bounds))
            .collect();
        let renderer = BlockRenderer::new(self.plugins(), &self.host, self.sanitize)
            .with_viewport(self.viewport);
        renderer.render_blocks(&visible).join("\n")
    }

    /// Markup for the document head: responsive rules and injected plugins
    pub fn head_markup(&self) -> String {
        let mut parts = Vec::new();
        if self.viewport == Viewport::Unknown {
            parts.push(responsive_stylesheet(&self.bounds));
        }
        let plugins = self.host.head_markup();
        if !plugins.is_empty() {
            parts.push(plugins);
        }
        parts.join("\n")
    }
}
