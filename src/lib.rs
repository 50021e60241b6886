// Chroma Miner - local browser for ChromaDB collections

pub mod config;
pub mod models;
pub mod types;
pub mod chroma;    // Chroma HTTP API client and query embedding
pub mod proxy;     // /api/chroma operations and response normalization
pub mod routes;
pub mod middleware;
pub mod server;    // Port allocation, port file, embedded server
pub mod shell;     // Window and application lifecycle
pub mod dev;
pub mod utils;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;
use chroma::{Embedder, HttpConnector, OpenAiEmbedder};

// Re-exports for convenience
pub use config::Config;
pub use models::AppState;

/// Wire the HTTP Chroma connector (and query embedder, if configured) into shared state.
pub fn build_state(config: Config) -> anyhow::Result<AppState> {
    let timeout = config.chroma.timeout_secs.map(Duration::from_secs);
    let embedder = config.embedding.as_ref().map(|embedding| {
        Arc::new(OpenAiEmbedder::new(reqwest::Client::new(), embedding)) as Arc<dyn Embedder>
    });
    let connector = HttpConnector::new(timeout, embedder)?;
    Ok(AppState::new(config, Arc::new(connector)))
}

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
