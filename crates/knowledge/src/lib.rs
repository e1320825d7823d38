//! Document question answering over local knowledge bases.
//!
//! Documents are split into overlapping character chunks, embedded through a
//! pluggable provider and stored in an in-memory vector index that is
//! snapshotted to disk. Queries are embedded, matched by cosine similarity
//! and rendered into a bounded context block for answer generation.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod flat_index;
pub mod ingest;
pub mod kb;
pub mod loader;
pub mod memory;
pub mod persistence;
pub mod progress;
pub mod rag;
pub mod retriever;
pub mod shared_index;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::{Chunker, Chunks};
pub use embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider};
pub use flat_index::FlatIndex;
pub use ingest::Ingestor;
pub use kb::KnowledgeBase;
pub use memory::{ConversationMemory, ConversationTurn, SessionStats};
pub use progress::{ProgressEvent, ProgressReporter};
pub use rag::{Answer, AnswerEngine, AnswerSettings, SourceRef};
pub use retriever::{render_context, RenderedContext, Retrieval, Retriever};
pub use shared_index::{AddOutcome, SharedIndex};
pub use types::{
    BaseStats, Chunk, Document, DocumentFailure, EmbeddedChunk, GenerationConfig,
    IndexedDocument, IngestConfig, IngestReport, KnowledgeBaseConfig, RetrievalResult, SearchHit,
};
pub use vector_index::{cosine_similarity, VectorIndex};
