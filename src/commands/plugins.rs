//! Plugin administration

use anyhow::Result;

use crate::model::Plugin;
use crate::Dyncontent;

pub fn format_plugin(plugin: &Plugin) -> String {
    let pages = if plugin.pages.is_empty() {
        "all pages".to_string()
    } else {
        plugin.pages.join(", ")
    };
    format!(
        "  {:<20} {:<9} {} ({}){}",
        plugin.id,
        plugin.plugin_type.as_str(),
        plugin.name,
        pages,
        if plugin.is_active { "" } else { " [inactive]" }
    )
}

pub async fn list(app: &Dyncontent) -> Result<()> {
    let admin = app.admin()?;
    let plugins = admin.list_plugins().await?;
    println!("Plugins ({}):", plugins.len());
    for plugin in &plugins {
        println!("{}", format_plugin(plugin));
    }
    Ok(())
}
