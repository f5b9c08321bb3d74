//! Vector store abstraction layer.
//!
//! A trait over the flat in-process index and the hosted backends (Qdrant,
//! Pinecone), selected by `vector_store.driver`.

mod flat;
mod pinecone;
mod qdrant;

pub use flat::FlatIndex;
pub use pinecone::PineconeBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{IndexEntry, SearchResult, VectorDriver, VectorStoreConfig};

/// Abstract trait for vector store operations.
///
/// Indexes only grow: there is no update or delete path.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the vector store is healthy and accessible.
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Add entries to the index.
    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VectorStoreError>;

    /// Return up to `top_k` entries nearest to `query_vector`, best first.
    async fn search(
        &self,
        query_vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<u64, VectorStoreError>;

    /// Backend name for logs and status output.
    fn name(&self) -> &'static str;
}

/// Create a vector store backend for vectors of `dimension` components.
pub async fn create_backend(
    config: &VectorStoreConfig,
    dimension: usize,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    match config.driver {
        VectorDriver::Flat => {
            let index = match &config.snapshot_path {
                Some(path) => FlatIndex::open(path, dimension, config.metric).await?,
                None => FlatIndex::new(dimension, config.metric),
            };
            Ok(Box::new(index))
        }
        VectorDriver::Qdrant => {
            let backend = QdrantBackend::new(config, dimension as u64)?;
            backend.create_collection().await?;
            Ok(Box::new(backend))
        }
        VectorDriver::Pinecone => Ok(Box::new(PineconeBackend::new(config, dimension)?)),
    }
}

/// Reject entries whose vector length differs from `expected`.
pub(crate) fn check_dimensions(
    entries: &[IndexEntry],
    expected: usize,
) -> Result<(), VectorStoreError> {
    match entries.iter().find(|e| e.dimension() != expected) {
        Some(bad) => Err(VectorStoreError::DimensionMismatch {
            expected,
            actual: bad.dimension(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistanceMetric, DocumentChunk};

    fn entry(vector: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            DocumentChunk {
                id: "c".to_string(),
                document_id: "d".to_string(),
                source: "s".to_string(),
                content: "text".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                start_offset: 0,
                end_offset: 4,
            },
            vector,
        )
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[entry(vec![0.0; 3])], 3).is_ok());
        let err = check_dimensions(&[entry(vec![0.0; 3]), entry(vec![0.0; 2])], 3).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_create_flat_backend() {
        let config = VectorStoreConfig {
            metric: DistanceMetric::Dot,
            ..Default::default()
        };
        let store = create_backend(&config, 8).await.unwrap();
        assert_eq!(store.name(), "flat");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
