//! Initialize a preview workspace

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::ContentConfig;

const CONFIG_TEMPLATE: &str = r#"# dyncontent configuration

# Content Manager API
api_base_url: http://localhost:8000

# Serve snapshots from local JSON files instead of the API
content_dir: content

session_file: .dyncontent/session.json

store:
  stale_secs: 30
  timeout_secs: 10

visibility:
  tablet_min: 768
  desktop_min: 1024

render:
  sanitize_markup: true

plugins:
  allow_scripts: false
  sandbox:
    enabled: true
    memory_limit: 16777216
    timeout_ms: 500

server:
  ip: localhost
  port: 4100
"#;

const SAMPLE_PAGE: &str = r#"{
  "content_blocks": [
    {
      "id": 1,
      "type": "text",
      "name": "hero-title",
      "page": "home",
      "position": "hero-title",
      "isActive": true,
      "sortOrder": 0,
      "content": { "text": "<h1>Welcome</h1>", "tag": "div" }
    },
    {
      "id": 2,
      "type": "logo",
      "name": "brand",
      "page": "home",
      "position": "header-left",
      "isActive": true,
      "content": { "url": "/logo.png", "alt": "Workspace", "link": "/" }
    },
    {
      "id": 3,
      "type": "plugin",
      "name": "notice",
      "page": "home",
      "position": "hero-subtitle",
      "isActive": true,
      "metadata": { "responsive": { "mobile": false } },
      "content": {
        "pluginId": "banner",
        "config": { "message": "New dashboards are live", "tone": "info" }
      }
    }
  ],
  "plugins": [
    {
      "id": "banner",
      "name": "Announcement banner",
      "type": "component",
      "code": "announcement-banner",
      "isActive": true,
      "pages": ["home"]
    },
    {
      "id": "brand-colors",
      "name": "Brand colors",
      "type": "style",
      "code": ".dc-banner { background: #eef4ff; }",
      "isActive": true
    }
  ],
  "settings": {}
}
"#;

/// Initialize a workspace in the given directory
pub fn init_workspace(target_dir: &Path) -> Result<()> {
    let content_dir = target_dir.join("content");
    fs::create_dir_all(&content_dir)?;

    let config_path = target_dir.join(ContentConfig::FILE_NAME);
    if config_path.exists() {
        tracing::info!("Keeping existing {:?}", config_path);
    } else {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
        tracing::info!("Created: {:?}", config_path);
    }

    let sample = content_dir.join("home.json");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_PAGE)?;
        tracing::info!("Created: {:?}", sample);
    }

    Ok(())
}
