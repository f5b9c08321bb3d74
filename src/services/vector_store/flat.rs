//! In-process exact-search index.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{VectorStore, check_dimensions};
use crate::error::VectorStoreError;
use crate::models::{DistanceMetric, IndexEntry, SearchResult};

/// Flat (brute-force) vector index guarded by a read/write lock.
///
/// Every insert is validated in full before the index is touched, so a
/// document's entries land together or not at all.
pub struct FlatIndex {
    entries: RwLock<Vec<IndexEntry>>,
    dimension: usize,
    metric: DistanceMetric,
    snapshot_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dimension: usize,
    entries: Vec<&'a IndexEntry>,
}

#[derive(Deserialize)]
struct Snapshot {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Create an empty, memory-only index.
    pub fn new(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimension,
            metric,
            snapshot_path: None,
        }
    }

    /// Open an index backed by a JSON snapshot, loading it if present.
    pub async fn open(
        path: &Path,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self, VectorStoreError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
        let entries = if exists {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
            let snapshot: Snapshot = serde_json::from_slice(&bytes)
                .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
            if snapshot.dimension != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: dimension,
                    actual: snapshot.dimension,
                });
            }
            check_dimensions(&snapshot.entries, dimension)?;
            info!(
                path = %path.display(),
                entries = snapshot.entries.len(),
                "loaded index snapshot"
            );
            snapshot.entries
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            dimension,
            metric,
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    fn score(&self, query: &[f32], vector: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::Cosine => {
                let (dot, qq, vv) = query.iter().zip(vector).fold(
                    (0.0f32, 0.0f32, 0.0f32),
                    |(dot, qq, vv), (q, v)| (dot + q * v, qq + q * q, vv + v * v),
                );
                let denom = (qq * vv).sqrt();
                if denom > f32::EPSILON { dot / denom } else { 0.0 }
            }
            DistanceMetric::Dot => query.iter().zip(vector).map(|(q, v)| q * v).sum(),
            DistanceMetric::Euclidean => {
                let dist: f32 = query
                    .iter()
                    .zip(vector)
                    .map(|(q, v)| (q - v) * (q - v))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + dist)
            }
        }
    }

    /// Write `current` followed by `pending` to the snapshot file.
    async fn write_snapshot(
        &self,
        path: &Path,
        current: &[IndexEntry],
        pending: &[IndexEntry],
    ) -> Result<(), VectorStoreError> {
        let snapshot = SnapshotRef {
            dimension: self.dimension,
            entries: current.iter().chain(pending.iter()).collect(),
        };
        let bytes = serde_json::to_vec(&snapshot)
            .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
        }

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| VectorStoreError::SnapshotError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for FlatIndex {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn insert(&self, entries: Vec<IndexEntry>) -> Result<(), VectorStoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        check_dimensions(&entries, self.dimension)?;

        let mut guard = self.entries.write().await;
        if let Some(path) = &self.snapshot_path {
            self.write_snapshot(path, &guard, &entries).await?;
        }
        debug!(added = entries.len(), total = guard.len() + entries.len(), "flat insert");
        guard.extend(entries);
        Ok(())
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        if query_vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let guard = self.entries.read().await;
        let mut scored: Vec<(usize, f32)> = guard
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, self.score(&query_vector, &entry.vector)))
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult::from_entry(&guard[i], score))
            .collect())
    }

    async fn count(&self) -> Result<u64, VectorStoreError> {
        Ok(self.entries.read().await.len() as u64)
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}
