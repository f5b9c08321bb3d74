//! Text chunking with overlap for embedding.

use crate::models::{Document, DocumentChunk, IndexingConfig};

/// Text chunker that splits documents into overlapping, bounded chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap size in characters
    overlap: usize,
}

/// Character span of a chunk before it is attached to a document.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Span {
    text: String,
    start: usize,
    end: usize,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    pub fn new(config: &IndexingConfig) -> Self {
        let chunk_size = (config.chunk_size as usize).max(1);
        let overlap = (config.chunk_overlap as usize).min(chunk_size - 1);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::new(&IndexingConfig::default())
    }

    /// Chunk a document into overlapping segments.
    pub fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let spans = self.split(&document.content);
        let total_chunks = spans.len() as u32;

        spans
            .into_iter()
            .enumerate()
            .map(|(idx, span)| {
                DocumentChunk::from_document(
                    document,
                    span.text,
                    idx as u32,
                    total_chunks,
                    span.start as u64,
                    span.end as u64,
                )
            })
            .collect()
    }

    /// Number of chunks `text` splits into.
    pub fn count(&self, text: &str) -> usize {
        self.split(text).len()
    }

    fn split(&self, content: &str) -> Vec<Span> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = content.chars().collect();
        let total_chars = chars.len();

        if total_chars <= self.chunk_size {
            return vec![Span {
                text: content.to_string(),
                start: 0,
                end: total_chars,
            }];
        }

        let step = self.chunk_size - self.overlap;
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let adjusted_end = self.find_break_point(&chars, start, end, total_chars);

            let text: String = chars[start..adjusted_end].iter().collect();
            if !text.trim().is_empty() {
                spans.push(Span {
                    text,
                    start,
                    end: adjusted_end,
                });
            }

            if adjusted_end >= total_chars {
                break;
            }

            // A pulled-back break must still make progress past the overlap.
            let next = adjusted_end.saturating_sub(self.overlap);
            start = if next > start { next } else { start + step };
        }

        spans
    }

    /// Find a natural break point near the target end position.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        // Look for a natural break point within the last 20% of the chunk
        let search_start = target_end.saturating_sub(self.chunk_size / 5).max(start + 1);
        if search_start >= target_end {
            return target_end;
        }
        let search_range = &chars[search_start..target_end];

        // Priority: double newline > single newline > sentence end > space
        let mut best_break = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range[i - 1] == '\n' {
                        best_break = Some(pos + 1);
                    }
                    last_newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if chars.get(pos + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    last_space = Some(pos + 1);
                }
                _ => {}
            }
        }

        best_break
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_document(content: &str) -> Document {
        Document::new("test.txt", content.to_string(), "test_checksum".to_string())
    }

    fn chunker(size: u32, overlap: u32) -> TextChunker {
        TextChunker::new(&IndexingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            ..Default::default()
        })
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunker = TextChunker::with_defaults();
        let doc = create_test_document("The sky is blue.");
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "The sky is blue.");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 16);
        assert_eq!(chunks[0].document_id, doc.id);
        assert_eq!(chunks[0].source, "test.txt");
    }

    #[test]
    fn test_empty_document() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk(&create_test_document("")).is_empty());
        assert!(chunker.chunk(&create_test_document(" \n\t")).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_indices() {
        let chunker = chunker(200, 40);
        let content = "a".repeat(500);
        let doc = create_test_document(&content);
        let chunks = chunker.chunk(&doc);

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.total_chunks, chunks.len() as u32);
            assert!(chunk.content.chars().count() <= 200);
        }
        assert_eq!(chunks.last().unwrap().end_offset, 500);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = chunker(100, 20);
        let content = "x".repeat(250);
        let chunks = chunker.chunk(&create_test_document(&content));

        for pair in chunks.windows(2) {
            assert!(pair[1].start_offset < pair[0].end_offset);
            assert_eq!(pair[0].end_offset - pair[1].start_offset, 20);
        }
    }

    #[test]
    fn test_breaks_on_sentence_boundary() {
        let chunker = chunker(50, 0);
        let content = "First sentence is here. Second sentence follows it and keeps going on.";
        let chunks = chunker.chunk(&create_test_document(content));

        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.ends_with(' ') || chunks[0].content.ends_with('.'));
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = chunker(10, 2);
        let content = "하늘은 파랗다. 바다도 파랗다. 풀은 초록색이다.";
        let chunks = chunker.chunk(&create_test_document(content));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 10);
        }
    }

    #[test]
    fn test_count_matches_chunk() {
        let chunker = chunker(64, 16);
        let content = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        let doc = create_test_document(&content);
        assert_eq!(chunker.count(&content), chunker.chunk(&doc).len());
    }
}
