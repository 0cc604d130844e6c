//! dyncontent: dynamic content blocks for workspace pages
//!
//! Content blocks and plugins are authored in a Content Manager and fetched
//! per page as a snapshot. This crate resolves the blocks for a page and
//! position, filters them by viewport, renders them to sanitized HTML and
//! hosts the page's plugins. A preview server and an admin CLI sit on top.

pub mod admin;
pub mod commands;
pub mod config;
pub mod model;
pub mod plugin;
pub mod render;
pub mod resolver;
pub mod server;
pub mod service;
pub mod session;
pub mod store;
pub mod view;
pub mod visibility;

use anyhow::Result;
use std::path::{Path, PathBuf};

use admin::AdminClient;
use config::ContentConfig;
use service::ContentService;
use session::{FileSessionStore, SessionManager};

/// The main application
#[derive(Clone)]
pub struct Dyncontent {
    /// Loaded configuration
    pub config: ContentConfig,
    /// Base directory
    pub base_dir: PathBuf,
}

impl Dyncontent {
    /// Create an instance from a directory holding `dyncontent.yml`
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = ContentConfig::load_or_default(&base_dir)?;
        Ok(Self { config, base_dir })
    }

    /// Resolve a configured path against the base directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn service(&self) -> Result<ContentService> {
        ContentService::from_config(&self.config, &self.base_dir)
    }

    pub fn session(&self) -> SessionManager<FileSessionStore> {
        SessionManager::new(FileSessionStore::new(
            self.resolve_path(&self.config.session_file),
        ))
    }

    /// Admin client carrying the restored session token, if any
    pub fn admin(&self) -> Result<AdminClient> {
        let mut session = self.session();
        session.restore(chrono::Utc::now())?;
        let client = AdminClient::new(&self.config.api_base_url, self.config.store.timeout())?;
        Ok(client.with_token(session.token().map(str::to_string)))
    }
}
