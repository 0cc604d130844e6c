//! Content block administration

use anyhow::Result;

use crate::model::ContentBlock;
use crate::Dyncontent;

/// One listing line per block
pub fn format_block(block: &ContentBlock) -> String {
    format!(
        "  #{:<6} {:<7} {}/{} {}{}",
        block.id,
        block.block_type.as_str(),
        block.page,
        block.position,
        block.name,
        if block.is_active { "" } else { " [inactive]" }
    )
}

/// List blocks, optionally for one page
pub async fn list(app: &Dyncontent, page: Option<&str>) -> Result<()> {
    let admin = app.admin()?;
    let mut blocks = admin.list_blocks(page).await?;
    blocks.sort_by(|a, b| {
        (a.page.as_str(), a.position.as_str(), a.sort_order)
            .cmp(&(b.page.as_str(), b.position.as_str(), b.sort_order))
    });

    println!("Content blocks ({}):", blocks.len());
    for block in &blocks {
        println!("{}", format_block(block));
    }
    Ok(())
}

pub async fn delete(app: &Dyncontent, id: &str) -> Result<()> {
    let admin = app.admin()?;
    admin.delete_block(id).await?;
    tracing::info!("Deleted content block {}", id);
    println!("Deleted content block {}", id);
    Ok(())
}

/// Toggle `isActive` on a block
pub async fn set_active(app: &Dyncontent, id: &str, active: bool) -> Result<()> {
    let admin = app.admin()?;
    let block = admin
        .update_block(id, &serde_json::json!({ "isActive": active }))
        .await?;
    println!("{}", format_block(&block));
    Ok(())
}
