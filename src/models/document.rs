use serde::{Deserialize, Serialize};

/// A loaded, normalized document awaiting chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Uploaded file name, or a path for CLI ingestion.
    pub name: String,
    pub content: String,
    pub checksum: String,
    pub size_bytes: u64,
    pub created_at: String,
}

/// A bounded-length span of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub source: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Character offset (inclusive) in the normalized text.
    pub start_offset: u64,
    /// Character offset (exclusive) in the normalized text.
    pub end_offset: u64,
}

/// A chunk paired with its embedding, as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

impl Document {
    pub fn generate_id(name: &str, checksum: &str) -> String {
        use sha2::{Digest, Sha256};
        let input = format!("{}:{}", name, checksum);
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(name: impl Into<String>, content: String, checksum: String) -> Self {
        let name = name.into();
        let id = Self::generate_id(&name, &checksum);
        Self {
            id,
            size_bytes: content.len() as u64,
            name,
            content,
            checksum,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl DocumentChunk {
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        Self {
            id: Self::generate_id(&document.id, chunk_index),
            document_id: document.id.clone(),
            source: document.name.clone(),
            content,
            chunk_index,
            total_chunks,
            start_offset,
            end_offset,
        }
    }
}

impl IndexEntry {
    pub fn new(chunk: DocumentChunk, vector: Vec<f32>) -> Self {
        Self { chunk, vector }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_generate_id() {
        let id = Document::generate_id("notes.txt", "abc");
        assert_eq!(id.len(), 32);
        assert_ne!(id, Document::generate_id("notes.txt", "abd"));
    }

    #[test]
    fn test_chunk_generate_id() {
        let id = DocumentChunk::generate_id("abc123", 5);
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
        assert_eq!(id, DocumentChunk::generate_id("abc123", 5));
        assert_ne!(id, DocumentChunk::generate_id("abc123", 6));
    }

    #[test]
    fn test_document_new() {
        let doc = Document::new("sky.txt", "The sky is blue.".to_string(), "sum".to_string());
        assert_eq!(doc.size_bytes, 16);
        assert_eq!(doc.name, "sky.txt");
        assert!(!doc.created_at.is_empty());
    }
}
