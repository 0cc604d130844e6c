//! Upload an asset through the Content Manager

use anyhow::{bail, Result};
use std::path::Path;

use crate::Dyncontent;

pub async fn run(app: &Dyncontent, file: &Path) -> Result<()> {
    let path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        app.base_dir.join(file)
    };
    if !path.is_file() {
        bail!("not a file: {}", path.display());
    }

    let admin = app.admin()?;
    let uploaded = admin.upload(&path).await?;
    tracing::info!("Uploaded {:?}", path);
    println!("{}", uploaded.url);
    Ok(())
}
