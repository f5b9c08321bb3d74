use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "ragqa";
pub const DEFAULT_TOP_K: u32 = 5;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "RAGQA_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|p| p.join("ragqa").join("config.toml"))
    }

    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Apply `BACKEND_*`, `VECTOR_DB_TYPE` and provider key overrides.
    ///
    /// Empty values are ignored so an unset-but-exported variable does not
    /// clobber the file. Values that fail to parse are rejected.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("BACKEND_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("BACKEND_PORT") {
            self.server.port = port.trim().parse().map_err(|e| {
                ConfigError::ValidationError(format!("BACKEND_PORT={:?}: {}", port, e))
            })?;
        }
        if let Some(driver) = get("VECTOR_DB_TYPE") {
            self.vector_store.driver = driver
                .parse()
                .map_err(|e| ConfigError::ValidationError(format!("VECTOR_DB_TYPE: {}", e)))?;
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.embedding.api_key = Some(key.clone());
            self.generation.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.embedding.base_url = url.clone();
            self.generation.base_url = url;
        }
        if let Some(key) = get("PINECONE_API_KEY") {
            self.vector_store.pinecone_api_key = Some(key);
        }
        if let Some(host) = get("PINECONE_HOST") {
            self.vector_store.pinecone_host = Some(host);
        }
        if let Some(url) = get("QDRANT_URL") {
            self.vector_store.url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.indexing.chunk_size == 0 {
            return fail("indexing.chunk_size must be at least 1");
        }
        if self.indexing.chunk_overlap >= self.indexing.chunk_size {
            return fail("indexing.chunk_overlap must be smaller than indexing.chunk_size");
        }
        if self.indexing.max_file_size == 0 {
            return fail("indexing.max_file_size must be at least 1");
        }
        if self.embedding.dimension == 0 {
            return fail("embedding.dimension must be at least 1");
        }
        if self.embedding.batch_size == 0 {
            return fail("embedding.batch_size must be at least 1");
        }
        if self.retrieval.top_k == 0 {
            return fail("retrieval.top_k must be at least 1");
        }
        if self.embedding.provider == EmbeddingProvider::OpenAi
            && !has_value(&self.embedding.api_key)
        {
            return fail("OPENAI_API_KEY is required for the openai embedding provider");
        }
        if self.generation.provider == GenerationProvider::OpenAi
            && !has_value(&self.generation.api_key)
        {
            return fail("OPENAI_API_KEY is required for the openai generation provider");
        }
        if self.vector_store.driver == VectorDriver::Pinecone {
            if !has_value(&self.vector_store.pinecone_api_key) {
                return fail("PINECONE_API_KEY is required for the pinecone vector store");
            }
            if !has_value(&self.vector_store.pinecone_host) {
                return fail("vector_store.pinecone_host is required for the pinecone vector store");
            }
        }
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn has_value(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which embedding implementation backs the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint
    #[default]
    OpenAi,
    /// Offline feature hashing
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_openai_url() -> String {
    DEFAULT_OPENAI_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_batch_size() -> u32 {
    64
}

fn default_embedding_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            base_url: default_openai_url(),
            api_key: None,
            model: default_embedding_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Which answer generator backs the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// OpenAI-compatible `/chat/completions` endpoint
    #[default]
    OpenAi,
    /// Offline sentence extraction from the retrieved chunks
    Extractive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub provider: GenerationProvider,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    #[serde(default = "default_generation_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_generation_model() -> String {
    DEFAULT_GENERATION_MODEL.to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_generation_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::default(),
            base_url: default_openai_url(),
            api_key: None,
            model: default_generation_model(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Vector store backend selector (`VECTOR_DB_TYPE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorDriver {
    /// In-process flat index
    #[default]
    #[serde(alias = "faiss", alias = "FAISS")]
    Flat,
    /// Qdrant collection
    Qdrant,
    /// Pinecone hosted index
    Pinecone,
}

impl std::str::FromStr for VectorDriver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" | "faiss" | "memory" => Ok(VectorDriver::Flat),
            "qdrant" => Ok(VectorDriver::Qdrant),
            "pinecone" => Ok(VectorDriver::Pinecone),
            other => Err(format!("unknown vector store driver: {}", other)),
        }
    }
}

impl std::fmt::Display for VectorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorDriver::Flat => write!(f, "flat"),
            VectorDriver::Qdrant => write!(f, "qdrant"),
            VectorDriver::Pinecone => write!(f, "pinecone"),
        }
    }
}

/// Similarity metric used by the flat index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    Euclidean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub driver: VectorDriver,

    #[serde(default)]
    pub metric: DistanceMetric,

    /// Flat index snapshot file; in-memory only when unset.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pinecone_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pinecone_api_key: Option<String>,

    #[serde(default)]
    pub pinecone_namespace: String,

    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_store_timeout() -> u64 {
    30
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            driver: VectorDriver::default(),
            metric: DistanceMetric::default(),
            snapshot_path: None,
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
            pinecone_host: None,
            pinecone_api_key: None,
            pinecone_namespace: String::new(),
            timeout_secs: default_store_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/.git/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.venv/**".to_string(),
    ]
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

fn default_top_k() -> u32 {
    DEFAULT_TOP_K
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn offline() -> Config {
        let mut config = Config::default();
        config.embedding.provider = EmbeddingProvider::Hashing;
        config.generation.provider = GenerationProvider::Extractive;
        config
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.vector_store.driver, VectorDriver::Flat);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BACKEND_HOST", "127.0.0.1"),
            ("BACKEND_PORT", "9100"),
            ("VECTOR_DB_TYPE", "PINECONE"),
            ("OPENAI_API_KEY", "sk-test"),
            ("PINECONE_API_KEY", "pc-test"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.vector_store.driver, VectorDriver::Pinecone);
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.vector_store.pinecone_api_key.as_deref(), Some("pc-test"));
    }

    #[test]
    fn test_env_ignores_empty_values() {
        let mut config = Config::default();
        config
            .apply_env(|k| match k {
                "BACKEND_HOST" | "BACKEND_PORT" | "VECTOR_DB_TYPE" => Some("  ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.vector_store.driver, VectorDriver::Flat);
    }

    #[test]
    fn test_env_rejects_unparsable_values() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "VECTOR_DB_TYPE").then(|| "pinecon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("pinecon"));

        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "BACKEND_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("BACKEND_PORT"));
    }

    #[test]
    fn test_vector_driver_parse() {
        assert_eq!("FAISS".parse::<VectorDriver>().unwrap(), VectorDriver::Flat);
        assert_eq!("qdrant".parse::<VectorDriver>().unwrap(), VectorDriver::Qdrant);
        assert!("milvus".parse::<VectorDriver>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(offline().validate().is_ok());

        let mut overlap = offline();
        overlap.indexing.chunk_overlap = overlap.indexing.chunk_size;
        assert!(overlap.validate().is_err());

        let missing_key = Config::default();
        assert!(missing_key.validate().is_err());

        let mut pinecone = offline();
        pinecone.vector_store.driver = VectorDriver::Pinecone;
        pinecone.vector_store.pinecone_api_key = Some("key".to_string());
        assert!(pinecone.validate().is_err());
        pinecone.vector_store.pinecone_host = Some("https://idx.pinecone.io".to_string());
        assert!(pinecone.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8123

[vector_store]
driver = "faiss"
metric = "euclidean"

[indexing]
chunk_size = 400
chunk_overlap = 50
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.vector_store.driver, VectorDriver::Flat);
        assert_eq!(config.vector_store.metric, DistanceMetric::Euclidean);
        assert_eq!(config.indexing.chunk_size, 400);
        assert_eq!(config.embedding.model, DEFAULT_EMBEDDING_MODEL);
    }
}
