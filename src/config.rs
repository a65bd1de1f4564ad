use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_COLLECTION_NAME: &str = "mindgap-index";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHUNK_SIZE: usize = 450;
const DEFAULT_CHUNK_OVERLAP: usize = 80;
const DEFAULT_SEARCH_TOP_K: usize = 3;
const DEFAULT_PROGRESS_PATH: &str = "mindgap-progress.json";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the MindGap retrieval engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the managed Qdrant instance, when a remote index is wanted.
    pub qdrant_url: Option<String>,
    /// Name of the Qdrant collection holding study material.
    pub qdrant_collection_name: String,
    /// Credential for the managed Qdrant instance. Absent in local-only mode.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Base URL of an OpenAI-compatible embeddings API.
    pub openai_base_url: String,
    /// Credential for the OpenAI-compatible embeddings API.
    pub openai_api_key: Option<String>,
    /// Window width of the chunker, in whitespace tokens.
    pub chunk_size: usize,
    /// Tokens shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Result count used when a search does not specify one.
    pub search_top_k: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// File backing the quiz progress ledger.
    pub progress_path: String,
}

/// Supported embedding backends for the retrieval pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic offline byte-hashing embedder.
    Hash,
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
}

/// Connection settings for the managed remote index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIndexSettings {
    /// Base URL of the Qdrant service.
    pub url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Collection that stores the chunks.
    pub collection: String,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset, so `FOO=` in a `.env` file falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let embedding_provider = match get("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            None => EmbeddingProvider::Hash,
        };
        let embedding_dimension =
            parse_or("EMBEDDING_DIMENSION", get("EMBEDDING_DIMENSION"), DEFAULT_EMBEDDING_DIMENSION)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }
        let openai_api_key = get("OPENAI_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".to_string()));
        }

        Ok(Self {
            qdrant_url: get("QDRANT_URL"),
            qdrant_collection_name: get("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            qdrant_api_key: get("QDRANT_API_KEY"),
            embedding_provider,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension,
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_api_key,
            chunk_size: parse_or("CHUNK_SIZE", get("CHUNK_SIZE"), DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_or("CHUNK_OVERLAP", get("CHUNK_OVERLAP"), DEFAULT_CHUNK_OVERLAP)?,
            search_top_k: parse_or("SEARCH_TOP_K", get("SEARCH_TOP_K"), DEFAULT_SEARCH_TOP_K)?,
            server_port: get("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            progress_path: get("PROGRESS_PATH")
                .unwrap_or_else(|| DEFAULT_PROGRESS_PATH.to_string()),
        })
    }

    /// Remote index settings, present only when both a URL and a credential are configured.
    pub fn remote_index(&self) -> Option<RemoteIndexSettings> {
        match (&self.qdrant_url, &self.qdrant_api_key) {
            (Some(url), Some(api_key)) => Some(RemoteIndexSettings {
                url: url.clone(),
                api_key: api_key.clone(),
                collection: self.qdrant_collection_name.clone(),
            }),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: None,
            qdrant_collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            qdrant_api_key: None,
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_api_key: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            search_top_k: DEFAULT_SEARCH_TOP_K,
            server_port: None,
            progress_path: DEFAULT_PROGRESS_PATH.to_string(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        remote_index = config.remote_index().is_some(),
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        embedding_dimension = config.embedding_dimension,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
