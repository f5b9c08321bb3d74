//! Retrieval and answer models.

use serde::{Deserialize, Serialize};

use super::document::IndexEntry;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// A single retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub source: String,
    pub content: String,
    pub chunk_index: u32,
    /// Similarity, higher is closer.
    pub score: f32,
}

impl SearchResult {
    pub fn from_entry(entry: &IndexEntry, score: f32) -> Self {
        Self {
            chunk_id: entry.chunk.id.clone(),
            document_id: entry.chunk.document_id.clone(),
            source: entry.chunk.source.clone(),
            content: entry.chunk.content.clone(),
            chunk_index: entry.chunk.chunk_index,
            score,
        }
    }
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: String,
    pub source: String,
    pub chunks_added: usize,
}

/// A generated answer along with the chunks it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SearchResult>,
    pub duration_ms: u64,
}
