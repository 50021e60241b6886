//! API Routes
//!
//! - `/api/chroma` - Proxy to the Chroma service named in the query string
//! - `/api/health` - Health check used by the dev supervisor
//! - `/` - Static file serving (browser UI)

pub mod chroma;
pub mod health;
pub mod static_files;

use axum::Router;
use tower_http::trace::TraceLayer;
use crate::middleware::apply_cors;
use crate::models::AppState;
use tracing::info;

/// Create the main application router
///
/// API routes take precedence over static files.
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let static_dir = static_files::resolve_static_dir(&state.config.server.static_dir);
    let origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(chroma::router(state))
        .merge(health::router());

    let router = Router::new()
        .merge(api_router)
        .merge(static_files::router(static_dir))
        .layer(TraceLayer::new_for_http());

    apply_cors(router, &origins)
}
