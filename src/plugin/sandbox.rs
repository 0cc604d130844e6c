//! Isolated QuickJS evaluation for component plugins
//!
//! Each evaluation gets a fresh context with no host bindings: the component
//! sees only `config` and `props` as plain JSON and must return a string.
//! Contexts run on their own thread so a runaway script is abandoned after
//! the configured timeout instead of stalling the render.

use quick_js::Context;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::{ComponentProps, PluginError};
use crate::config::SandboxConfig;

/// Runs component code in throwaway QuickJS contexts
#[derive(Debug, Clone)]
pub struct Sandbox {
    memory_limit: usize,
    timeout: Duration,
    started: Arc<AtomicUsize>,
}

impl Sandbox {
    pub fn new(config: &SandboxConfig) -> Self {
        Self {
            memory_limit: config.memory_limit,
            timeout: Duration::from_millis(config.timeout_ms),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of evaluation threads started so far
    pub fn evaluations(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Evaluate `code` as a function body of `(config, props)`
    pub fn run(
        &self,
        code: &str,
        config: &Value,
        props: &ComponentProps,
    ) -> Result<String, PluginError> {
        let script = wrap_component(
            code,
            &serde_json::to_string(config)?,
            &serde_json::to_string(props)?,
        );
        let memory_limit = self.memory_limit;

        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("dc-sandbox".to_string())
            .spawn(move || {
                let _ = tx.send(evaluate(&script, memory_limit));
            })
            .map_err(|e| PluginError::Sandbox(format!("failed to spawn sandbox thread: {}", e)))?;
        self.started.fetch_add(1, Ordering::SeqCst);

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Sandboxed component exceeded {:?}, abandoning it", self.timeout);
                Err(PluginError::Timeout(self.timeout.as_millis() as u64))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PluginError::Panicked),
        }
    }
}

/// Components that ran past the time limit, keyed by plugin id and code
///
/// An abandoned evaluation keeps its thread busy, so a component in this set
/// is never started again. Clones share the same set; the preview server
/// hands one to every view it builds. Editing the code clears the entry.
#[derive(Debug, Clone, Default)]
pub struct TimedOutComponents {
    entries: Arc<Mutex<HashSet<u64>>>,
}

impl TimedOutComponents {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(plugin_id: &str, code: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        plugin_id.hash(&mut hasher);
        code.hash(&mut hasher);
        hasher.finish()
    }

    pub fn contains(&self, plugin_id: &str, code: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.contains(&Self::key(plugin_id, code))
    }

    pub fn insert(&self, plugin_id: &str, code: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(Self::key(plugin_id, code));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evaluate(script: &str, memory_limit: usize) -> Result<String, PluginError> {
    let context = Context::builder()
        .memory_limit(memory_limit)
        .build()
        .map_err(|e| PluginError::Sandbox(format!("failed to create JS context: {:?}", e)))?;

    context
        .eval_as::<String>(script)
        .map_err(|e| PluginError::Sandbox(format!("{:?}", e)))
}

fn wrap_component(code: &str, config_json: &str, props_json: &str) -> String {
    format!(
        r#"
        (function (config, props) {{
            "use strict";
            var render = function (config, props) {{
{code}
            }};
            var out;
            try {{
                out = render(config, props);
            }} catch (e) {{
                throw new Error("component threw: " + (e && e.message ? e.message : String(e)));
            }}
            if (out === undefined || out === null) {{
                return "";
            }}
            if (typeof out !== "string") {{
                throw new TypeError("component must return a string");
            }}
            return out;
        }})({config}, {props})
        "#,
        code = code,
        config = config_json,
        props = props_json
    )
}
