//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use std::collections::HashMap;

use super::{VectorStore, check_dimensions};
use crate::error::VectorStoreError;
use crate::models::{IndexEntry, SearchResult, VectorStoreConfig};

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    embedding_dim: u64,
}

impl QdrantBackend {
    /// Create a new Qdrant backend from configuration.
    pub fn new(config: &VectorStoreConfig, embedding_dim: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            embedding_dim,
        })
    }

    async fn collection_points(&self) -> Result<Option<u64>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(info.result.map_or(0, |r| r.points_count.unwrap_or(0)))),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    /// Create the collection if it doesn't exist.
    pub async fn create_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_points().await?.is_some() {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection).vectors_config(
            VectorParamsBuilder::new(self.embedding_dim, Distance::Cosine),
        );

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }
}

fn to_point(entry: IndexEntry) -> PointStruct {
    let chunk = entry.chunk;
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert("document_id".to_string(), chunk.document_id.into());
    payload.insert("source".to_string(), chunk.source.into());
    payload.insert("content".to_string(), chunk.content.into());
    payload.insert("chunk_index".to_string(), i64::from(chunk.chunk_index).into());
    payload.insert("total_chunks".to_string(), i64::from(chunk.total_chunks).into());
    payload.insert("start_offset".to_string(), (chunk.start_offset as i64).into());
    payload.insert("end_offset".to_string(), (chunk.end_offset as i64).into());

    PointStruct::new(chunk.id, entry.vector, payload)
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> i64 {
    payload
        .get(key)
        .and_then(|v| match &v.kind {
            Some(Kind::IntegerValue(n)) => Some(*n),
            _ => None,
        })
        .unwrap_or(0)
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VectorStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        check_dimensions(&entries, self.embedding_dim as usize)?;

        let points: Vec<PointStruct> = entries.into_iter().map(to_point).collect();
        let upsert = UpsertPointsBuilder::new(&self.collection, points).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::InsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let search = SearchPointsBuilder::new(&self.collection, query_vector, top_k as u64)
            .with_payload(true);

        let results = self
            .client
            .search_points(search)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let search_results = results
            .result
            .into_iter()
            .map(|point| {
                let chunk_id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    Some(PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };
                let payload = point.payload;

                SearchResult {
                    chunk_id,
                    document_id: payload_str(&payload, "document_id"),
                    source: payload_str(&payload, "source"),
                    content: payload_str(&payload, "content"),
                    chunk_index: payload_int(&payload, "chunk_index") as u32,
                    score: point.score,
                }
            })
            .collect();

        Ok(search_results)
    }

    async fn count(&self) -> Result<u64, VectorStoreError> {
        Ok(self.collection_points().await?.unwrap_or(0))
    }

    fn name(&self) -> &'static str {
        "qdrant"
    }
}
