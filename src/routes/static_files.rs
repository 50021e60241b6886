//! Static File Serving
//!
//! Serves the browser UI (connection form, collection list, document viewer)
//! from the configured static directory.

use axum::{
    Router,
    routing::get,
    response::{IntoResponse, Response},
    http::{StatusCode, header},
};
use tower_http::services::ServeDir;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Locate the static directory, trying the configured path as given and
/// next to the executable.
pub fn resolve_static_dir(configured: &Path) -> PathBuf {
    let mut candidates = vec![configured.to_path_buf()];
    if configured.is_relative() {
        if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
            candidates.push(exe_dir.join(configured));
        }
    }

    for path in &candidates {
        if path.is_dir() {
            info!(path = %path.display(), "Found static files directory");
            return path.clone();
        }
    }

    warn!(path = %configured.display(), "Static files directory not found, serving built-in page");
    configured.to_path_buf()
}

pub fn index_path(static_dir: &Path) -> PathBuf {
    static_dir.join("index.html")
}

/// Create router for serving static files
pub fn router(static_dir: PathBuf) -> Router {
    let serve_dir = ServeDir::new(&static_dir)
        .append_index_html_on_directories(true);
    let index = index_path(&static_dir);

    Router::new()
        .route("/", get(move || serve_index(index.clone())))
        .fallback_service(serve_dir)
}

async fn serve_index(index: PathBuf) -> Response {
    if let Ok(content) = tokio::fs::read_to_string(&index).await {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            content,
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        FALLBACK_HTML,
    )
        .into_response()
}

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Chroma Miner</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 720px; margin: 40px auto; color: #222; }
        code { background: #f2f2f2; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>Chroma Miner</h1>
    <p>The server is running but the UI files were not found. Set <code>STATIC_DIR</code> to the directory containing <code>index.html</code>.</p>
    <ul>
        <li><code>GET /api/health</code></li>
        <li><code>GET /api/chroma?endpoint=heartbeat&amp;url=http://localhost&amp;port=8000</code></li>
        <li><code>GET /api/chroma?endpoint=collections</code></li>
        <li><code>GET /api/chroma?endpoint=collections/{name}/documents&amp;limit=100</code></li>
        <li><code>POST /api/chroma?endpoint=collections/{name}/search</code> with <code>{"query": "...", "limit": 10}</code></li>
    </ul>
</body>
</html>"#;
