//! Preview server with live reload

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ContentConfig;
use crate::plugin::{ComponentRegistry, TimedOutComponents};
use crate::render::html::escape_text;
use crate::service::ContentService;
use crate::store::{is_valid_page_key, CachedSnapshot};
use crate::view::PageContent;
use crate::visibility::Viewport;

/// Live reload script injected into preview documents
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Viewport width client hints, in order of preference
const WIDTH_HEADERS: [&str; 2] = ["sec-ch-viewport-width", "viewport-width"];

/// Shared server state
pub struct AppState {
    pub service: ContentService,
    pub config: Arc<ContentConfig>,
    pub registry: Arc<ComponentRegistry>,
    /// Sandboxed components that timed out, shared by every rendered view
    pub timed_out: TimedOutComponents,
    pub reload_tx: broadcast::Sender<()>,
    pub live_reload: bool,
}

impl AppState {
    pub fn new(
        service: ContentService,
        config: ContentConfig,
        registry: Arc<ComponentRegistry>,
        live_reload: bool,
    ) -> Self {
        let (reload_tx, _) = broadcast::channel::<()>(16);
        Self {
            service,
            config: Arc::new(config),
            registry,
            timed_out: TimedOutComponents::new(),
            reload_tx,
            live_reload,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderQuery {
    width: Option<u32>,
    fallback: Option<String>,
}

/// Build the preview router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/render/:page/:position", get(render_handler))
        .route("/preview/:page", get(preview_handler))
        .route("/api/snapshot/:page", get(snapshot_handler))
        .route("/__livereload", get(livereload_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the preview server
pub async fn start(state: AppState, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(state);
    let app = build_router(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Preview server running at {}", url);
    println!("Content from {}", state.service.store().describe());

    if open {
        if let Err(e) = open_browser(&format!("{}/preview/home", url)) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if state.live_reload {
        match watched_dir(&state) {
            Some(dir) => {
                println!("Live reload enabled. Watching {}", dir.display());
                let watch_state = state.clone();
                let runtime = tokio::runtime::Handle::current();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = watch_and_reload(dir, watch_state, runtime) {
                        tracing::error!("File watcher error: {}", e);
                    }
                });
            }
            None => {
                tracing::warn!("Watch mode needs a local content_dir; live reload disabled");
            }
        }
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn watched_dir(state: &AppState) -> Option<PathBuf> {
    state
        .config
        .content_dir
        .as_ref()
        .filter(|dir| dir.exists())
        .cloned()
}

/// Watch the content directory, drop cached snapshots and notify clients
fn watch_and_reload(
    content_dir: PathBuf,
    state: Arc<AppState>,
    runtime: tokio::runtime::Handle,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();

    // Debounce editor save bursts
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;
    debouncer
        .watcher()
        .watch(&content_dir, RecursiveMode::Recursive)?;
    tracing::debug!("Watching: {:?}", content_dir);

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        e.path
                            .extension()
                            .map(|ext| ext == "json")
                            .unwrap_or(false)
                    })
                    .collect();

                if changed.is_empty() {
                    continue;
                }

                for event in &changed {
                    println!("Content changed: {}", event.path.display());
                }

                runtime.block_on(state.service.cache().invalidate_all());
                let _ = state.reload_tx.send(());
            }
            Ok(Err(e)) => {
                tracing::error!("Watch error: {:?}", e);
            }
            Err(e) => {
                tracing::error!("Channel error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

fn bad_page(page: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("invalid page key: {:?}", page),
    )
        .into_response()
}

/// Width from the query string, falling back to client hints
fn viewport_for(width: Option<u32>, headers: &HeaderMap) -> Viewport {
    let hinted = || {
        WIDTH_HEADERS.iter().find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|w| *w >= 0.0)
                .map(|w| w as u32)
        })
    };
    Viewport::from_hint(width.or_else(hinted))
}

/// Build a view for `page` off the async workers and run `f` on it
///
/// Component plugins may execute in the sandbox, which blocks for up to its
/// timeout.
async fn with_view<F>(
    state: &AppState,
    page: &str,
    viewport: Viewport,
    f: F,
) -> Result<String, StatusCode>
where
    F: FnOnce(&PageContent) -> String + Send + 'static,
{
    let cached = state.service.snapshot(page).await;
    let config = state.config.clone();
    let registry = state.registry.clone();
    let timed_out = state.timed_out.clone();
    let page = page.to_string();

    tokio::task::spawn_blocking(move || {
        let mut view =
            PageContent::with_registry(&page, &config, registry).with_timed_out(timed_out);
        view.set_viewport(viewport);
        view.apply_cached(cached);
        f(&view)
    })
    .await
    .map_err(|e| {
        tracing::error!("Render task failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn render_handler(
    State(state): State<Arc<AppState>>,
    Path((page, position)): Path<(String, String)>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
) -> Response {
    if !is_valid_page_key(&page) {
        return bad_page(&page);
    }
    let viewport = viewport_for(query.width, &headers);
    let fallback = query.fallback;

    match with_view(&state, &page, viewport, move |view| {
        view.render_position(&position, fallback.as_deref())
    })
    .await
    {
        Ok(fragment) => Html(fragment).into_response(),
        Err(status) => status.into_response(),
    }
}

async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
) -> Response {
    if !is_valid_page_key(&page) {
        return bad_page(&page);
    }
    let viewport = viewport_for(query.width, &headers);

    match with_view(&state, &page, viewport, preview_document).await {
        Ok(document) if state.live_reload => Html(inject_live_reload(&document)).into_response(),
        Ok(document) => Html(document).into_response(),
        Err(status) => status.into_response(),
    }
}

/// Full HTML document with one section per position
pub fn preview_document(view: &PageContent) -> String {
    let mut body = String::new();
    for position in view.positions() {
        body.push_str(&format!(
            "<section class=\"dc-position\" data-position=\"{}\">\n{}\n</section>\n",
            escape_text(position),
            view.render_position(position, None)
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n{}\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_text(view.page()),
        view.head_markup(),
        body
    )
}

async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    Path(page): Path<String>,
) -> Response {
    if !is_valid_page_key(&page) {
        return bad_page(&page);
    }
    let CachedSnapshot {
        version, snapshot, ..
    } = state.service.snapshot(&page).await;
    (
        [("x-snapshot-version", version.to_string())],
        Json(snapshot.as_ref().clone()),
    )
        .into_response()
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Inject live reload script into an HTML document
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
