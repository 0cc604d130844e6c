//! Render a page or a single position to stdout

use anyhow::{bail, Result};

use crate::server::preview_document;
use crate::store::is_valid_page_key;
use crate::view::PageContent;
use crate::visibility::Viewport;
use crate::Dyncontent;

pub struct RenderOptions<'a> {
    pub page: &'a str,
    pub position: Option<&'a str>,
    pub width: Option<u32>,
    pub fallback: Option<&'a str>,
}

/// Render and return the markup
pub async fn render(app: &Dyncontent, options: &RenderOptions<'_>) -> Result<String> {
    if !is_valid_page_key(options.page) {
        bail!("invalid page key: {:?}", options.page);
    }

    let service = app.service()?;
    let cached = service.snapshot(options.page).await;
    tracing::debug!(
        "Rendering {} from snapshot v{}",
        options.page,
        cached.version
    );

    let mut view = PageContent::new(options.page, &app.config);
    view.set_viewport(Viewport::from_hint(options.width));
    view.apply_cached(cached);

    Ok(match options.position {
        Some(position) => view.render_position(position, options.fallback),
        None => preview_document(&view),
    })
}

pub async fn run(app: &Dyncontent, options: &RenderOptions<'_>) -> Result<()> {
    let output = render(app, options).await?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::init_workspace;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_render_sample_position() {
        let temp = TempDir::new().unwrap();
        init_workspace(temp.path()).unwrap();
        let app = Dyncontent::new(temp.path()).unwrap();

        let html = render(
            &app,
            &RenderOptions {
                page: "home",
                position: Some("hero-title"),
                width: None,
                fallback: None,
            },
        )
        .await
        .unwrap();
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("data-block-type=\"text\""));
    }

    #[tokio::test]
    async fn test_render_missing_position_uses_fallback() {
        let temp = TempDir::new().unwrap();
        init_workspace(temp.path()).unwrap();
        let app = Dyncontent::new(temp.path()).unwrap();

        let html = render(
            &app,
            &RenderOptions {
                page: "home",
                position: Some("footer"),
                width: Some(1280),
                fallback: Some("<p>Default footer</p>"),
            },
        )
        .await
        .unwrap();
        assert_eq!(html, "<p>Default footer</p>");
    }

    #[tokio::test]
    async fn test_render_document_hides_by_width() {
        let temp = TempDir::new().unwrap();
        init_workspace(temp.path()).unwrap();
        let app = Dyncontent::new(temp.path()).unwrap();

        let options = |width| RenderOptions {
            page: "home",
            position: None,
            width: Some(width),
            fallback: None,
        };
        let mobile = render(&app, &options(375)).await.unwrap();
        assert!(!mobile.contains("New dashboards are live"));
        let desktop = render(&app, &options(1280)).await.unwrap();
        assert!(desktop.contains("New dashboards are live"));
        assert!(desktop.contains("dc-plugin-style-brand-colors"));
    }

    #[tokio::test]
    async fn test_render_rejects_bad_page() {
        let temp = TempDir::new().unwrap();
        let app = Dyncontent::new(temp.path()).unwrap();
        let result = render(
            &app,
            &RenderOptions {
                page: "../etc",
                position: None,
                width: None,
                fallback: None,
            },
        )
        .await;
        assert!(result.is_err());
    }
}
