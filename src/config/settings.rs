//! Content configuration (dyncontent.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Base URL of the superadmin API
    pub api_base_url: String,
    /// Local snapshot directory used instead of the API when set
    pub content_dir: Option<PathBuf>,
    /// Where session keys are persisted
    pub session_file: PathBuf,

    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub visibility: VisibilityConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            content_dir: None,
            session_file: PathBuf::from(".dyncontent/session.json"),
            store: StoreConfig::default(),
            visibility: VisibilityConfig::default(),
            render: RenderConfig::default(),
            plugins: PluginConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ContentConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ContentConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `dyncontent.yml` from `base_dir`, falling back to defaults
    pub fn load_or_default<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let path = base_dir.as_ref().join(Self::FILE_NAME);
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub const FILE_NAME: &'static str = "dyncontent.yml";
}

/// Content Store fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a fetched snapshot is reused without refetching
    pub stale_secs: u64,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stale_secs: 30,
            timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Breakpoint boundaries in CSS pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub tablet_min: u32,
    pub desktop_min: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            tablet_min: 768,
            desktop_min: 1024,
        }
    }
}

/// Block rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pass editor markup through the allow-list sanitizer
    pub sanitize_markup: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sanitize_markup: true,
        }
    }
}

/// Plugin hosting settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Inject `script` plugins into rendered pages
    pub allow_scripts: bool,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// QuickJS sandbox for component plugins without a registry entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub enabled: bool,
    /// Heap limit per evaluation, in bytes
    pub memory_limit: usize,
    /// Wall-clock limit per evaluation
    pub timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_limit: 16 * 1024 * 1024,
            timeout_ms: 500,
        }
    }
}

/// Preview server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "localhost".to_string(),
            port: 4100,
        }
    }
}
