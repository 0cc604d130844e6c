//! Plugin host - registration state machine and teardown for one page lifetime

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::{ComponentProps, ComponentRegistry, PluginError, Sandbox, TimedOutComponents};
use crate::config::PluginConfig;
use crate::model::{Plugin, PluginType};
use crate::render::html::attr;
use crate::render::sanitize_html;

/// Registration state of one plugin id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Unregistered,
    Registering,
    Registered,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    Script,
    Style,
}

impl InjectionKind {
    fn tag(&self) -> &'static str {
        match self {
            InjectionKind::Script => "script",
            InjectionKind::Style => "style",
        }
    }
}

/// An element injected into the page head on behalf of a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedElement {
    pub plugin_id: String,
    pub kind: InjectionKind,
    pub element_id: String,
    pub body: String,
}

impl InjectedElement {
    pub fn to_html(&self) -> String {
        format!(
            "<{tag}{}{}>{}</{tag}>",
            attr("id", &self.element_id),
            attr("data-plugin-id", &self.plugin_id),
            self.body,
            tag = self.kind.tag()
        )
    }
}

/// Result of applying an eligible plugin set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied {
        registered: Vec<String>,
        removed: Vec<String>,
        failed: Vec<String>,
    },
    /// The set was older than one already applied and was ignored
    Stale { version: u64, current: u64 },
}

/// Hosts the plugins of one page view
#[derive(Debug)]
pub struct PluginHost {
    allow_scripts: bool,
    sanitize: bool,
    registry: Arc<ComponentRegistry>,
    sandbox: Option<Sandbox>,
    timed_out: TimedOutComponents,
    states: IndexMap<String, Registration>,
    injected: IndexMap<String, InjectedElement>,
    version: Option<u64>,
}

impl PluginHost {
    /// Create a host with the built-in component registry
    pub fn new(config: &PluginConfig, sanitize: bool) -> Self {
        Self::with_registry(config, sanitize, Arc::new(ComponentRegistry::with_builtins()))
    }

    pub fn with_registry(
        config: &PluginConfig,
        sanitize: bool,
        registry: Arc<ComponentRegistry>,
    ) -> Self {
        Self {
            allow_scripts: config.allow_scripts,
            sanitize,
            registry,
            sandbox: config.sandbox.enabled.then(|| Sandbox::new(&config.sandbox)),
            timed_out: TimedOutComponents::new(),
            states: IndexMap::new(),
            injected: IndexMap::new(),
            version: None,
        }
    }

    /// Share the record of timed-out components with other hosts
    pub fn with_timed_out(mut self, timed_out: TimedOutComponents) -> Self {
        self.timed_out = timed_out;
        self
    }

    /// Current state of a plugin id
    pub fn state(&self, plugin_id: &str) -> Registration {
        self.states
            .get(plugin_id)
            .cloned()
            .unwrap_or(Registration::Unregistered)
    }

    /// Version of the last applied plugin set
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Apply the eligible plugin set observed at `version`
    ///
    /// Entries whose id left the set are torn down; new script and style
    /// plugins are registered. Ids already seen are left alone.
    pub fn sync(&mut self, version: u64, eligible: &[&Plugin]) -> SyncOutcome {
        if let Some(current) = self.version {
            if version < current {
                tracing::debug!(
                    "Ignoring plugin set v{} (already at v{})",
                    version,
                    current
                );
                return SyncOutcome::Stale { version, current };
            }
        }
        self.version = Some(version);

        let eligible_ids: HashSet<&str> = eligible.iter().map(|p| p.id.as_str()).collect();
        let removed: Vec<String> = self
            .states
            .keys()
            .filter(|id| !eligible_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &removed {
            self.states.shift_remove(id);
            if self.injected.shift_remove(id).is_some() {
                tracing::info!(plugin_id = %id, "Removed plugin element");
            }
        }

        let mut registered = Vec::new();
        let mut failed = Vec::new();
        for plugin in eligible {
            let kind = match plugin.plugin_type {
                PluginType::Script => InjectionKind::Script,
                PluginType::Style => InjectionKind::Style,
                PluginType::Component => continue,
            };
            if self.states.contains_key(&plugin.id) {
                continue;
            }

            self.states
                .insert(plugin.id.clone(), Registration::Registering);
            match self.build_element(plugin, kind) {
                Ok(element) => {
                    tracing::debug!(plugin_id = %plugin.id, "Registered {} plugin", kind.tag());
                    self.injected.insert(plugin.id.clone(), element);
                    self.states
                        .insert(plugin.id.clone(), Registration::Registered);
                    registered.push(plugin.id.clone());
                }
                Err(e) => {
                    tracing::warn!(plugin_id = %plugin.id, "Plugin registration failed: {}", e);
                    self.states
                        .insert(plugin.id.clone(), Registration::Failed(e.to_string()));
                    failed.push(plugin.id.clone());
                }
            }
        }

        SyncOutcome::Applied {
            registered,
            removed,
            failed,
        }
    }

    fn build_element(
        &self,
        plugin: &Plugin,
        kind: InjectionKind,
    ) -> Result<InjectedElement, PluginError> {
        if kind == InjectionKind::Script && !self.allow_scripts {
            return Err(PluginError::ScriptsDisabled);
        }
        let closing = format!("</{}", kind.tag());
        if plugin.code.to_ascii_lowercase().contains(&closing) {
            return Err(PluginError::UnsafeCode(kind.tag()));
        }

        Ok(InjectedElement {
            plugin_id: plugin.id.clone(),
            kind,
            element_id: format!("dc-plugin-{}-{}", kind.tag(), slug::slugify(&plugin.id)),
            body: plugin.code.clone(),
        })
    }

    /// Elements currently injected, in registration order
    pub fn injected(&self) -> impl Iterator<Item = &InjectedElement> {
        self.injected.values()
    }

    /// Markup for the document head
    pub fn head_markup(&self) -> String {
        self.injected()
            .map(InjectedElement::to_html)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render a `component` plugin; errors and panics are returned, never raised
    pub fn render_component(
        &self,
        plugin: &Plugin,
        config: &Value,
        props: &ComponentProps,
    ) -> Result<String, PluginError> {
        let key = plugin.code.trim();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            if let Some(component) = self.registry.get(key) {
                return component.render(config, props);
            }
            match &self.sandbox {
                Some(sandbox) => {
                    if self.timed_out.contains(&plugin.id, &plugin.code) {
                        tracing::debug!("Skipping timed-out component {}", plugin.id);
                        return Err(PluginError::Timeout(sandbox.timeout().as_millis() as u64));
                    }
                    let html = match sandbox.run(&plugin.code, config, props) {
                        Err(PluginError::Timeout(ms)) => {
                            tracing::warn!("Component {} timed out and is disabled", plugin.id);
                            self.timed_out.insert(&plugin.id, &plugin.code);
                            return Err(PluginError::Timeout(ms));
                        }
                        result => result?,
                    };
                    if self.sanitize {
                        Ok(sanitize_html(&html)?)
                    } else {
                        Ok(html)
                    }
                }
                None => Err(PluginError::UnknownComponent(key.to_string())),
            }
        }));

        match outcome {
            Ok(result) => result,
            Err(_) => Err(PluginError::Panicked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SandboxConfig;
    use serde_json::json;

    fn config(allow_scripts: bool) -> PluginConfig {
        PluginConfig {
            allow_scripts,
            sandbox: SandboxConfig {
                timeout_ms: 2000,
                ..Default::default()
            },
        }
    }

    fn count(host: &PluginHost, id: &str) -> usize {
        host.injected().filter(|e| e.plugin_id == id).count()
    }

    #[test]
    fn test_registers_style_once() {
        let mut host = PluginHost::new(&config(false), true);
        let style = Plugin::new("theme", PluginType::Style, "body { color: navy; }");

        host.sync(1, &[&style]);
        host.sync(1, &[&style]);
        host.sync(2, &[&style, &style]);

        assert_eq!(count(&host, "theme"), 1);
        assert_eq!(host.state("theme"), Registration::Registered);
        assert_eq!(
            host.head_markup(),
            r#"<style id="dc-plugin-style-theme" data-plugin-id="theme">body { color: navy; }</style>"#
        );
    }

    #[test]
    fn test_scripts_disabled_by_default() {
        let mut host = PluginHost::new(&config(false), true);
        let script = Plugin::new("track", PluginType::Script, "console.log(1)");
        let outcome = host.sync(1, &[&script]);

        assert_eq!(
            outcome,
            SyncOutcome::Applied {
                registered: vec![],
                removed: vec![],
                failed: vec!["track".to_string()],
            }
        );
        assert_eq!(
            host.state("track"),
            Registration::Failed("script plugins are disabled".to_string())
        );
        assert_eq!(count(&host, "track"), 0);
    }

    #[test]
    fn test_script_injection_when_allowed() {
        let mut host = PluginHost::new(&config(true), true);
        let script = Plugin::new("Chat Widget", PluginType::Script, "window.chat = true;");
        host.sync(1, &[&script]);

        let element = host.injected().next().unwrap();
        assert_eq!(element.element_id, "dc-plugin-script-chat-widget");
        assert_eq!(element.kind, InjectionKind::Script);
        assert!(host.head_markup().starts_with("<script id=\"dc-plugin-script-chat-widget\""));
    }

    #[test]
    fn test_breakout_code_fails() {
        let mut host = PluginHost::new(&config(true), true);
        let script = Plugin::new("evil", PluginType::Script, "x</SCRIPT><img src=x>");
        host.sync(1, &[&script]);
        assert!(matches!(host.state("evil"), Registration::Failed(_)));
        assert_eq!(count(&host, "evil"), 0);
    }

    #[test]
    fn test_teardown_removes_only_missing_plugins() {
        let mut host = PluginHost::new(&config(true), true);
        let a = Plugin::new("a", PluginType::Style, "a{}");
        let b = Plugin::new("b", PluginType::Script, "b()");
        let c = Plugin::new("c", PluginType::Style, "c{}");

        host.sync(1, &[&a, &b, &c]);
        assert_eq!(host.injected().count(), 3);

        let outcome = host.sync(2, &[&a, &c]);
        assert_eq!(
            outcome,
            SyncOutcome::Applied {
                registered: vec![],
                removed: vec!["b".to_string()],
                failed: vec![],
            }
        );
        let remaining: Vec<_> = host.injected().map(|e| e.plugin_id.as_str()).collect();
        assert_eq!(remaining, vec!["a", "c"]);
        assert_eq!(host.state("b"), Registration::Unregistered);
    }

    #[test]
    fn test_stale_set_is_ignored() {
        let mut host = PluginHost::new(&config(false), true);
        let a = Plugin::new("a", PluginType::Style, "a{}");
        let b = Plugin::new("b", PluginType::Style, "b{}");

        host.sync(5, &[&b]);
        let outcome = host.sync(4, &[&a]);

        assert_eq!(outcome, SyncOutcome::Stale { version: 4, current: 5 });
        assert_eq!(host.version(), Some(5));
        assert_eq!(count(&host, "b"), 1);
        assert_eq!(count(&host, "a"), 0);
    }

    #[test]
    fn test_components_are_not_injected() {
        let mut host = PluginHost::new(&config(false), true);
        let component = Plugin::new("promo", PluginType::Component, "stat-counter");
        host.sync(1, &[&component]);
        assert_eq!(host.injected().count(), 0);
        assert_eq!(host.state("promo"), Registration::Unregistered);
    }

    #[test]
    fn test_render_component_registry_and_sandbox() {
        let host = PluginHost::new(&config(false), true);
        let props = ComponentProps::default();

        let registered = Plugin::new("cta", PluginType::Component, " call-to-action ");
        let html = host
            .render_component(&registered, &json!({"text": "Book", "href": "/book"}), &props)
            .unwrap();
        assert_eq!(html, r#"<a href="/book" class="dc-cta dc-cta-primary">Book</a>"#);

        let sandboxed = Plugin::new(
            "inline",
            PluginType::Component,
            r#"return "<p onclick='x()'>" + config.title + "</p><script>x()</script>";"#,
        );
        let html = host
            .render_component(&sandboxed, &json!({"title": "Hello"}), &props)
            .unwrap();
        assert_eq!(html, "<p>Hello</p>");
    }

    #[test]
    fn test_panicking_component_is_contained() {
        let mut registry = ComponentRegistry::new();
        registry.register(
            "explode",
            |_: &Value, _: &ComponentProps| -> Result<String, PluginError> {
                panic!("component bug")
            },
        );
        let host = PluginHost::with_registry(&config(false), true, Arc::new(registry));
        let plugin = Plugin::new("x", PluginType::Component, "explode");

        let result = host.render_component(&plugin, &json!({}), &ComponentProps::default());
        assert!(matches!(result, Err(PluginError::Panicked)));
    }

    #[test]
    fn test_timed_out_component_starts_one_thread() {
        let mut cfg = config(false);
        cfg.sandbox.timeout_ms = 50;
        let timed_out = TimedOutComponents::new();
        let props = ComponentProps::default();
        let spin = Plugin::new("spin", PluginType::Component, "while (true) {}");

        let host = PluginHost::with_registry(&cfg, true, Arc::new(ComponentRegistry::new()))
            .with_timed_out(timed_out.clone());
        for _ in 0..5 {
            let result = host.render_component(&spin, &json!({}), &props);
            assert!(matches!(result, Err(PluginError::Timeout(50))));
        }
        assert_eq!(host.sandbox.as_ref().unwrap().evaluations(), 1);

        // a later view sharing the record never starts it
        let next = PluginHost::with_registry(&cfg, true, Arc::new(ComponentRegistry::new()))
            .with_timed_out(timed_out.clone());
        let result = next.render_component(&spin, &json!({}), &props);
        assert!(matches!(result, Err(PluginError::Timeout(50))));
        assert_eq!(next.sandbox.as_ref().unwrap().evaluations(), 0);

        // edited code gets a fresh evaluation
        let fixed = Plugin::new("spin", PluginType::Component, "return 'ok';");
        assert_eq!(next.render_component(&fixed, &json!({}), &props).unwrap(), "ok");
        assert_eq!(next.sandbox.as_ref().unwrap().evaluations(), 1);
    }
}
