mod config;
mod document;
mod search;

pub use config::{
    CONFIG_ENV, Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_GENERATION_MODEL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TOP_K, DistanceMetric,
    EmbeddingConfig, EmbeddingProvider, GenerationConfig, GenerationProvider, IndexingConfig,
    RetrievalConfig, ServerConfig, VectorDriver, VectorStoreConfig,
};
pub use document::{Document, DocumentChunk, IndexEntry};
pub use search::{Answer, IngestReport, OutputFormat, SearchResult};
