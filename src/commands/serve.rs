//! Start the preview server

use anyhow::Result;
use std::sync::Arc;

use crate::plugin::ComponentRegistry;
use crate::server::{self, AppState};
use crate::Dyncontent;

pub struct ServeOptions {
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub watch: bool,
    pub open: bool,
}

pub async fn run(app: &Dyncontent, options: ServeOptions) -> Result<()> {
    let mut config = app.config.clone();
    config.content_dir = config.content_dir.map(|dir| app.resolve_path(&dir));

    let ip = options.ip.unwrap_or_else(|| config.server.ip.clone());
    let port = options.port.unwrap_or(config.server.port);

    let service = app.service()?;
    let registry = Arc::new(ComponentRegistry::with_builtins());
    tracing::debug!("Components: {:?}", registry.keys());

    let state = AppState::new(service, config, registry, options.watch);
    server::start(state, &ip, port, options.open).await
}
