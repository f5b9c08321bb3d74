mod chunker;
mod embedding;
mod generation;
mod loader;
mod pipeline;
pub mod vector_store;

pub use chunker::TextChunker;
pub use embedding::{Embedder, EmbeddingClient, HashingEmbedder};
pub use generation::{AnswerGenerator, ChatGenerator, ExtractiveGenerator, NO_ANSWER, build_prompt};
pub use loader::FileLoader;
pub use pipeline::{RagPipeline, build_pipeline};
pub use vector_store::{FlatIndex, PineconeBackend, QdrantBackend, VectorStore, create_backend};
