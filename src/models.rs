use std::collections::HashMap;
use std::sync::Arc;
use crate::chroma::ChromaConnector;
use crate::config::Config;
use crate::types::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connector: Arc<dyn ChromaConnector>,
}

impl AppState {
    pub fn new(config: Config, connector: Arc<dyn ChromaConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
        }
    }
}

pub const DEFAULT_CHROMA_URL: &str = "http://localhost";
pub const DEFAULT_CHROMA_PORT: u16 = 8000;
pub const DEFAULT_TENANT: &str = "default_tenant";
pub const DEFAULT_DATABASE: &str = "default_database";

/// Where and how to reach a Chroma service. Rebuilt from every proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub url: String,
    pub port: u16,
    pub api_key: Option<String>,
    pub tenant: Option<String>,
    pub database: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CHROMA_URL.to_string(),
            port: DEFAULT_CHROMA_PORT,
            api_key: None,
            tenant: None,
            database: None,
        }
    }
}

impl ConnectionConfig {
    pub fn from_params(params: &ProxyParams) -> AppResult<Self> {
        let port = match non_empty(&params.port) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidRequest(format!("invalid port '{}'", raw)))?,
            None => DEFAULT_CHROMA_PORT,
        };

        Ok(Self {
            url: non_empty(&params.url).unwrap_or(DEFAULT_CHROMA_URL).to_string(),
            port,
            api_key: non_empty(&params.api_key).map(String::from),
            tenant: non_empty(&params.tenant).map(String::from),
            database: non_empty(&params.database).map(String::from),
        })
    }

    pub fn uses_tls(&self) -> bool {
        self.url.starts_with("https")
    }

    /// `scheme://host:port` of the service, with any scheme in `url` stripped from the host.
    pub fn base_url(&self) -> String {
        let host = self
            .url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let scheme = if self.uses_tls() { "https" } else { "http" };
        format!("{}://{}:{}", scheme, host, self.port)
    }

    pub fn tenant(&self) -> &str {
        self.tenant.as_deref().unwrap_or(DEFAULT_TENANT)
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Query string of `/api/chroma`.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProxyParams {
    pub endpoint: Option<String>,
    pub url: Option<String>,
    pub port: Option<String>,
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    pub tenant: Option<String>,
    pub database: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

pub const DEFAULT_DOCUMENT_LIMIT: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}
