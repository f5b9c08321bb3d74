//! Pinecone vector store backend, spoken to over its data-plane REST API.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::{VectorStore, check_dimensions};
use crate::error::VectorStoreError;
use crate::models::{IndexEntry, SearchResult, VectorStoreConfig};

/// Pinecone caps upserts at 100 vectors per request for dense payloads.
const UPSERT_BATCH: usize = 100;

pub struct PineconeBackend {
    client: Client,
    host: String,
    namespace: String,
    dimension: usize,
}

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
struct ChunkMetadata {
    document_id: String,
    source: String,
    content: String,
    #[serde(default, deserialize_with = "metadata_u32")]
    chunk_index: u32,
    #[serde(default, deserialize_with = "metadata_u32")]
    total_chunks: u32,
}

/// Pinecone returns metadata numbers as floats (`0.0`), integers are accepted too.
fn metadata_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            value
        )));
    }
    Ok(value as u32)
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: ChunkMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: u64,
}

impl PineconeBackend {
    pub fn new(config: &VectorStoreConfig, dimension: usize) -> Result<Self, VectorStoreError> {
        let api_key = config
            .pinecone_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VectorStoreError::ConnectionError("missing PINECONE_API_KEY".into()))?;
        let host = config
            .pinecone_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                VectorStoreError::ConnectionError("missing vector_store.pinecone_host".into())
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key)
                .map_err(|e| VectorStoreError::ConnectionError(format!("invalid API key: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            host: normalize_host(host),
            namespace: config.pinecone_namespace.clone(),
            dimension,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, String>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(format!("status {}: {}", status.as_u16(), text));
        }

        response.json().await.map_err(|e| e.to_string())
    }
}

/// Index hosts are shown without a scheme in the Pinecone console.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl VectorStore for PineconeBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.post::<_, IndexStats>("/describe_index_stats", &serde_json::json!({}))
            .await
            .map(|_| true)
            .map_err(VectorStoreError::ConnectionError)
    }

    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VectorStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        check_dimensions(&entries, self.dimension)?;

        for batch in entries.chunks(UPSERT_BATCH) {
            let request = UpsertRequest {
                vectors: batch
                    .iter()
                    .map(|entry| UpsertVector {
                        id: &entry.chunk.id,
                        values: &entry.vector,
                        metadata: ChunkMetadata {
                            document_id: entry.chunk.document_id.clone(),
                            source: entry.chunk.source.clone(),
                            content: entry.chunk.content.clone(),
                            chunk_index: entry.chunk.chunk_index,
                            total_chunks: entry.chunk.total_chunks,
                        },
                    })
                    .collect(),
                namespace: &self.namespace,
            };

            self.post::<_, serde_json::Value>("/vectors/upsert", &request)
                .await
                .map_err(VectorStoreError::InsertError)?;
        }

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

        let request = QueryRequest {
            vector: &query_vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };

        let response: QueryResponse = self
            .post("/query", &request)
            .await
            .map_err(VectorStoreError::SearchError)?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| {
                let metadata = m.metadata.unwrap_or_default();
                SearchResult {
                    chunk_id: m.id,
                    document_id: metadata.document_id,
                    source: metadata.source,
                    content: metadata.content,
                    chunk_index: metadata.chunk_index,
                    score: m.score,
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<u64, VectorStoreError> {
        let stats: IndexStats = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await
            .map_err(VectorStoreError::CollectionError)?;
        Ok(stats.total_vector_count)
    }

    fn name(&self) -> &'static str {
        "pinecone"
    }
}
