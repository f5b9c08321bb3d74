//! Write and read paths over the loader, chunker, embedder, store and generator.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::chunker::TextChunker;
use super::embedding::{Embedder, EmbeddingClient, HashingEmbedder};
use super::generation::{AnswerGenerator, ChatGenerator, ExtractiveGenerator};
use super::loader::FileLoader;
use super::vector_store::{VectorStore, create_backend};
use crate::error::{AppError, IngestError, QueryError};
use crate::models::{
    Answer, Config, Document, EmbeddingProvider, GenerationProvider, IndexEntry, IngestReport,
    SearchResult,
};

pub struct RagPipeline {
    loader: FileLoader,
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn AnswerGenerator>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        loader: FileLoader,
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn AnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            loader,
            chunker,
            embedder,
            store,
            generator,
            top_k,
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn loader(&self) -> &FileLoader {
        &self.loader
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load, chunk, embed and index one uploaded file.
    pub async fn ingest(&self, name: &str, bytes: &[u8]) -> Result<IngestReport, IngestError> {
        let document = self.loader.load(name, bytes)?;
        self.ingest_document(document).await
    }

    /// Chunk, embed and index an already loaded document.
    ///
    /// Every embedding is computed before the store is touched, and the whole
    /// document goes in through a single insert.
    pub async fn ingest_document(&self, document: Document) -> Result<IngestReport, IngestError> {
        let start = Instant::now();
        let chunks = self.chunker.chunk(&document);

        let mut report = IngestReport {
            document_id: document.id.clone(),
            source: document.name.clone(),
            chunks_added: 0,
        };
        if chunks.is_empty() {
            debug!(source = %document.name, "document has no text, nothing to index");
            return Ok(report);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_documents(texts).await?;
        if vectors.len() != chunks.len() {
            return Err(IngestError::CountMismatch {
                chunks: chunks.len(),
                embeddings: vectors.len(),
            });
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();
        report.chunks_added = entries.len();
        self.store.insert(entries).await?;

        info!(
            source = %report.source,
            chunks = report.chunks_added,
            backend = self.store.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "document ingested"
        );
        Ok(report)
    }

    /// Nearest chunks for `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>, QueryError> {
        let question = checked_question(question)?;
        let vector = self.embedder.embed_query(question).await?;
        Ok(self.store.search(vector, self.top_k).await?)
    }

    /// Retrieve context for `question` and generate an answer from it.
    pub async fn answer(&self, question: &str) -> Result<Answer, QueryError> {
        let start = Instant::now();
        let trimmed = checked_question(question)?;

        let sources = self.retrieve(trimmed).await?;
        let answer = self.generator.generate(trimmed, &sources).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            retrieved = sources.len(),
            elapsed_ms = duration_ms,
            "question answered"
        );

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
            duration_ms,
        })
    }
}

fn checked_question(question: &str) -> Result<&str, QueryError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(QueryError::InvalidQuery("question must not be empty".to_string()));
    }
    Ok(trimmed)
}

/// Build the pipeline described by `config`.
pub async fn build_pipeline(config: &Config) -> Result<RagPipeline, AppError> {
    config.validate()?;

    let embedder: Arc<dyn Embedder> = match config.embedding.provider {
        EmbeddingProvider::OpenAi => Arc::new(EmbeddingClient::new(&config.embedding)?),
        EmbeddingProvider::Hashing => {
            Arc::new(HashingEmbedder::new(config.embedding.dimension as usize))
        }
    };

    let generator: Arc<dyn AnswerGenerator> = match config.generation.provider {
        GenerationProvider::OpenAi => Arc::new(ChatGenerator::new(&config.generation)?),
        GenerationProvider::Extractive => Arc::new(ExtractiveGenerator::default()),
    };

    let store: Arc<dyn VectorStore> =
        Arc::from(create_backend(&config.vector_store, embedder.dimension()).await?);

    info!(
        backend = store.name(),
        dimension = embedder.dimension(),
        top_k = config.retrieval.top_k,
        "pipeline ready"
    );

    Ok(RagPipeline::new(
        FileLoader::new(&config.indexing),
        TextChunker::new(&config.indexing),
        embedder,
        store,
        generator,
        config.retrieval.top_k as usize,
    ))
}
