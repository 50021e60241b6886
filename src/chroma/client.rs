// Chroma HTTP API (v2) client
// API Reference: https://docs.trychroma.com/reference/

use super::{
    ChromaApi, ChromaConnector, ChromaError, CollectionInfo, Embedder, GetRequest, GetResult,
    Include, QueryRequest, QueryResult,
};
use crate::models::ConnectionConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Builds an [`HttpChromaClient`] for each request's connection settings,
/// sharing one connection pool and one optional embedder.
pub struct HttpConnector {
    http: Client,
    embedder: Option<Arc<dyn Embedder>>,
}

impl HttpConnector {
    pub fn new(timeout: Option<Duration>, embedder: Option<Arc<dyn Embedder>>) -> Result<Self, ChromaError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ChromaError::InvalidConfig(e.to_string()))?;
        Ok(Self { http, embedder })
    }
}

impl ChromaConnector for HttpConnector {
    fn connect(&self, connection: &ConnectionConfig) -> Result<Arc<dyn ChromaApi>, ChromaError> {
        let client = HttpChromaClient::new(self.http.clone(), connection, self.embedder.clone())?;
        Ok(Arc::new(client))
    }
}

pub struct HttpChromaClient {
    http: Client,
    base_url: Url,
    tenant: String,
    database: String,
    api_key: Option<String>,
    embedder: Option<Arc<dyn Embedder>>,
}

#[derive(Serialize)]
struct GetBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    include: &'a [Include],
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: &'a [Include],
}

#[derive(Deserialize)]
struct ChromaErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl HttpChromaClient {
    pub fn new(
        http: Client,
        connection: &ConnectionConfig,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, ChromaError> {
        let base = connection.base_url();
        let base_url = Url::parse(&base)
            .map_err(|e| ChromaError::InvalidConfig(format!("{}: {}", base, e)))?;

        Ok(Self {
            http,
            base_url,
            tenant: connection.tenant().to_string(),
            database: connection.database().to_string(),
            api_key: connection.api_key.clone(),
            embedder,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ChromaError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChromaError::InvalidConfig(format!("{} cannot be a base URL", self.base_url)))?
            .clear()
            .extend(segments);
        Ok(url)
    }

    fn collection_endpoint(&self, rest: &[&str]) -> Result<Url, ChromaError> {
        let mut segments = vec![
            "api",
            "v2",
            "tenants",
            self.tenant.as_str(),
            "databases",
            self.database.as_str(),
            "collections",
        ];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ChromaError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| ChromaError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChromaErrorBody>(&error_text)
                .ok()
                .and_then(|body| body.message.or(body.error))
                .unwrap_or(error_text);
            return Err(ChromaError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChromaError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ChromaApi for HttpChromaClient {
    async fn heartbeat(&self) -> Result<(), ChromaError> {
        let url = self.endpoint(&["api", "v2", "heartbeat"])?;
        let _: serde_json::Value = self.send(self.http.get(url)).await?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ChromaError> {
        let url = self.collection_endpoint(&[])?;
        self.send(self.http.get(url)).await
    }

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo, ChromaError> {
        let url = self.collection_endpoint(&[name])?;
        self.send(self.http.get(url)).await
    }

    async fn count(&self, collection: &CollectionInfo) -> Result<u64, ChromaError> {
        let url = self.collection_endpoint(&[collection.id.as_str(), "count"])?;
        self.send(self.http.get(url)).await
    }

    async fn get(
        &self,
        collection: &CollectionInfo,
        request: GetRequest,
    ) -> Result<GetResult, ChromaError> {
        let url = self.collection_endpoint(&[collection.id.as_str(), "get"])?;
        let body = GetBody {
            limit: request.limit,
            include: &request.include,
        };
        debug!(collection = %collection.name, limit = ?request.limit, "Fetching documents");
        self.send(self.http.post(url).json(&body)).await
    }

    async fn query(
        &self,
        collection: &CollectionInfo,
        request: QueryRequest,
    ) -> Result<QueryResult, ChromaError> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or(ChromaError::EmbeddingUnavailable)?;
        let embedding = embedder.embed(&request.query_text).await?;

        let url = self.collection_endpoint(&[collection.id.as_str(), "query"])?;
        let body = QueryBody {
            query_embeddings: vec![embedding],
            n_results: request.n_results,
            include: &request.include,
        };
        debug!(collection = %collection.name, n_results = request.n_results, "Running semantic query");
        self.send(self.http.post(url).json(&body)).await
    }
}
