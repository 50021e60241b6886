//! ChromaDB access
//!
//! The proxy talks to Chroma only through the [`ChromaApi`] trait. A
//! [`ChromaConnector`] turns the per-request [`ConnectionConfig`] into a
//! client, so every call is self-describing and nothing about the remote
//! service is cached between requests.
//!
//! - [`client::HttpChromaClient`] speaks the Chroma HTTP API (v2)
//! - [`embedder::OpenAiEmbedder`] turns query text into an embedding for
//!   semantic queries

pub mod client;
pub mod embedder;

pub use client::{HttpChromaClient, HttpConnector};
pub use embedder::{Embedder, OpenAiEmbedder};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use crate::models::ConnectionConfig;

pub type Metadata = HashMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ChromaError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no embedding function available for query text")]
    EmbeddingUnavailable,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("invalid connection settings: {0}")]
    InvalidConfig(String),
}

/// Fields requested from `get`/`query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    Documents,
    Metadatas,
    Embeddings,
    Distances,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub limit: Option<usize>,
    pub include: Vec<Include>,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query_text: String,
    pub n_results: usize,
    pub include: Vec<Include>,
}

/// Column-oriented `get` response; entries are aligned by position with `ids`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GetResult {
    pub ids: Vec<String>,
    pub documents: Option<Vec<Option<String>>>,
    pub metadatas: Option<Vec<Option<Metadata>>>,
    pub embeddings: Option<Vec<Option<Vec<f32>>>>,
}

/// Column-oriented `query` response, one row per query text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Option<Vec<Option<Vec<Option<String>>>>>,
    pub metadatas: Option<Vec<Option<Vec<Option<Metadata>>>>>,
    pub distances: Option<Vec<Option<Vec<Option<f32>>>>>,
}

#[async_trait]
pub trait ChromaApi: Send + Sync {
    async fn heartbeat(&self) -> Result<(), ChromaError>;

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ChromaError>;

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ChromaError>;

    async fn count(&self, collection: &CollectionInfo) -> Result<u64, ChromaError>;

    async fn get(
        &self,
        collection: &CollectionInfo,
        request: GetRequest,
    ) -> Result<GetResult, ChromaError>;

    async fn query(
        &self,
        collection: &CollectionInfo,
        request: QueryRequest,
    ) -> Result<QueryResult, ChromaError>;
}

pub trait ChromaConnector: Send + Sync {
    fn connect(&self, connection: &ConnectionConfig) -> Result<Arc<dyn ChromaApi>, ChromaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_result_tolerates_missing_columns() {
        let raw = r#"{"ids": ["a", "b"], "documents": ["x", null], "include": ["documents"]}"#;
        let result: GetResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.ids, vec!["a", "b"]);
        assert_eq!(result.documents, Some(vec![Some("x".to_string()), None]));
        assert!(result.metadatas.is_none());
        assert!(result.embeddings.is_none());
    }

    #[test]
    fn test_include_serializes_lowercase() {
        let json = serde_json::to_string(&[Include::Documents, Include::Distances]).unwrap();
        assert_eq!(json, r#"["documents","distances"]"#);
    }
}
