//! Development server with live reload and periodic revalidation

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use notify_debouncer_mini::{new_debouncer, notify::RecursiveMode, DebounceEventResult};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::generator::Generator;
use crate::{Blog, CONFIG_FILE};

/// Live reload script injected into HTML pages
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

/// Server state
struct ServerState {
    public_dir: PathBuf,
    reload_tx: broadcast::Sender<()>,
}

/// Start the development server.
///
/// Every `revalidate` seconds the site is regenerated from Notion; 0 turns
/// this off. Edits to the config file and the static directory are picked up
/// immediately.
pub async fn start(blog: &Blog, ip: &str, port: u16, revalidate: u64, open: bool) -> Result<()> {
    // Create broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        public_dir: blog.public_dir.clone(),
        reload_tx: reload_tx.clone(),
    });

    // Create router with live reload endpoint
    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    if revalidate > 0 {
        println!("Revalidating from Notion every {}s.", revalidate);
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    // Regenerations are serialized through this lock
    let shared = Arc::new(Mutex::new(blog.clone()));

    if revalidate > 0 {
        let shared = shared.clone();
        let reload_tx = reload_tx.clone();
        tokio::spawn(async move {
            revalidate_loop(shared, Duration::from_secs(revalidate), reload_tx).await;
        });
    }

    {
        let shared = shared.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_and_reload(shared, reload_tx).await {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Regenerate from Notion on a fixed interval
async fn revalidate_loop(
    blog: Arc<Mutex<Blog>>,
    period: Duration,
    reload_tx: broadcast::Sender<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The site was generated right before the server started
    interval.tick().await;

    loop {
        interval.tick().await;
        tracing::debug!("Revalidating from Notion...");

        let blog = blog.lock().await;
        match blog.generate(false).await {
            Ok(true) => {
                println!("✅ Revalidated: new content from Notion");
                let _ = reload_tx.send(());
            }
            Ok(false) => tracing::debug!("Revalidation found no changes"),
            Err(e) => tracing::error!("Revalidation failed: {:#}", e),
        }
    }
}

/// What a batch of file events touched
#[derive(Debug, Default, PartialEq)]
struct WatchChange {
    config: bool,
    assets: bool,
}

fn classify<'a, I>(paths: I, config_path: &Path, static_dir: &Path) -> WatchChange
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut change = WatchChange::default();
    for path in paths {
        let path_str = path.to_string_lossy();
        if path_str.contains(".DS_Store") || path_str.ends_with('~') {
            continue;
        }
        if path == config_path {
            change.config = true;
        } else if path.starts_with(static_dir) {
            change.assets = true;
        }
    }
    change
}

/// Watch the site directory for config edits and the static directory, and trigger reload
async fn watch_and_reload(blog: Arc<Mutex<Blog>>, reload_tx: broadcast::Sender<()>) -> Result<()> {
    let (site_dir, static_dir) = {
        let blog = blog.lock().await;
        (canonical(&blog.base_dir), canonical(&blog.static_dir))
    };
    let config_path = site_dir.join(CONFIG_FILE);

    let (tx, mut rx) = mpsc::unbounded_channel::<DebounceEventResult>();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(Duration::from_millis(500), move |res: DebounceEventResult| {
        let _ = tx.send(res);
    })?;

    // Editors that save by renaming replace the config inode, so watch its directory
    debouncer
        .watcher()
        .watch(&site_dir, RecursiveMode::NonRecursive)?;
    tracing::debug!("Watching: {:?}", config_path);

    if static_dir.exists() {
        debouncer
            .watcher()
            .watch(&static_dir, RecursiveMode::Recursive)?;
        tracing::debug!("Watching: {:?}", static_dir);
    }

    while let Some(result) = rx.recv().await {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        let change = classify(
            events.iter().map(|e| e.path.as_path()),
            &config_path,
            &static_dir,
        );
        if change == WatchChange::default() {
            continue;
        }

        let mut blog = blog.lock().await;
        let outcome = if change.config {
            println!("\n📝 {} changed, reloading configuration...", CONFIG_FILE);
            reload_config(&mut blog).await
        } else {
            println!("\n📝 Static files changed, copying...");
            Generator::new(&blog).and_then(|g| g.copy_assets())
        };

        match outcome {
            Ok(()) => {
                println!("✅ Regenerated successfully!");
                let _ = reload_tx.send(());
            }
            Err(e) => println!("❌ Generation failed: {:#}", e),
        }
    }

    Ok(())
}

/// Re-read the configuration and regenerate with it
async fn reload_config(blog: &mut Blog) -> Result<()> {
    let reloaded = Blog::new(&blog.base_dir)?;
    if reloaded.public_dir != blog.public_dir {
        tracing::warn!("public_dir changed; restart the server to serve the new location");
    }
    *blog = reloaded;
    blog.generate(false).await?;
    Generator::new(blog)?.copy_assets()
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
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

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let file_path = resolve_path(&state.public_dir, request.uri().path());

    let is_html = file_path
        .extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false);

    if is_html {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => Html(inject_live_reload(&content)).into_response(),
            Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        }
    } else {
        let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
        match service.try_call(request).await {
            Ok(response) => response.into_response(),
            Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
        }
    }
}

/// Map a request path onto the public directory
fn resolve_path(public_dir: &Path, path: &str) -> PathBuf {
    let decoded = percent_encoding::percent_decode_str(path).decode_utf8_lossy();
    let clean_path = decoded.trim_start_matches('/');
    if clean_path.split('/').any(|segment| segment == "..") {
        return public_dir.join("__not_found__");
    }

    let candidate = public_dir.join(clean_path);
    if candidate.is_dir() {
        candidate.join("index.html")
    } else if candidate.exists() {
        candidate
    } else {
        let with_html = public_dir.join(format!("{}.html", clean_path));
        if with_html.exists() {
            with_html
        } else {
            candidate
        }
    }
}

/// Inject live reload script into HTML content
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
