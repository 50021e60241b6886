use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Default first port probed for the embedded server.
pub const DEFAULT_START_PORT: u16 = 3000;
/// Upper bound on sequential port probes.
pub const DEFAULT_PORT_SCAN_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            Mode::Development
        } else {
            Mode::Production
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mode: Mode,
    pub server: ServerConfig,
    pub chroma: ChromaConfig,
    pub embedding: Option<EmbeddingConfig>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub start_port: u16,
    pub port_scan_limit: u32,
    pub port_file: PathBuf,
    pub static_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromaConfig {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let embedding = match env::var("EMBEDDING_URL") {
            Ok(url) if !url.trim().is_empty() => Some(EmbeddingConfig {
                url: url.trim_end_matches('/').to_string(),
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok().filter(|k| !k.is_empty()),
            }),
            _ => None,
        };

        let mode = Mode::from_env_value(&env::var("APP_ENV").unwrap_or_default());
        // packaged builds log to the user data dir
        let log_dir = env::var("LOG_DIR").ok().map(PathBuf::from).or_else(|| match mode {
            Mode::Production => dirs::data_local_dir().map(|d| d.join("chroma-miner").join("logs")),
            Mode::Development => None,
        });

        Ok(Self {
            mode,
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                start_port: env::var("START_PORT")
                    .unwrap_or_else(|_| DEFAULT_START_PORT.to_string())
                    .parse()?,
                port_scan_limit: env::var("PORT_SCAN_LIMIT")
                    .unwrap_or_else(|_| DEFAULT_PORT_SCAN_LIMIT.to_string())
                    .parse()?,
                port_file: env::var("PORT_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(".port")),
                static_dir: env::var("STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("static")),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_default()
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            chroma: ChromaConfig {
                timeout_secs: env::var("CHROMA_TIMEOUT_SECS")
                    .ok()
                    .map(|v| v.parse())
                    .transpose()?,
            },
            embedding,
            log_dir,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Production,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                start_port: DEFAULT_START_PORT,
                port_scan_limit: DEFAULT_PORT_SCAN_LIMIT,
                port_file: PathBuf::from(".port"),
                static_dir: PathBuf::from("static"),
                cors_allowed_origins: Vec::new(),
            },
            chroma: ChromaConfig { timeout_secs: None },
            embedding: None,
            log_dir: None,
        }
    }
}
