//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a knowledge base.
///
/// Sizes are measured in characters (Unicode scalar values).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    #[serde(default)]
    pub name: String,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget for the rendered retrieval context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Similarity floor; hits scoring below it are dropped
    #[serde(default = "default_min_score")]
    pub min_score: Option<f32>,

    /// Conversation turns replayed into the prompt
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Ingestion settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Answer generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    5
}

fn default_max_context_chars() -> usize {
    8000
}

fn default_min_score() -> Option<f32> {
    Some(0.20)
}

fn default_max_history_turns() -> usize {
    10
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            min_score: default_min_score(),
            max_history_turns: default_max_history_turns(),
            embedding: EmbeddingConfig::default(),
            ingest: IngestConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Reject sizings the chunker and retriever cannot work with.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        if self.top_k == 0 {
            return Err(AppError::InvalidConfiguration(
                "top_k must be greater than zero".to_string(),
            ));
        }

        if let Some(min_score) = self.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                return Err(AppError::InvalidConfiguration(format!(
                    "min_score must lie in [-1, 1], got {}",
                    min_score
                )));
            }
        }

        if self.ingest.max_concurrent_documents == 0 {
            return Err(AppError::InvalidConfiguration(
                "ingest.max_concurrent_documents must be greater than zero".to_string(),
            ));
        }

        self.embedding.validate()?;
        self.generation.validate()
    }
}

/// Ingestion coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Documents chunked and embedded at the same time
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,
}

fn default_max_concurrent_documents() -> usize {
    2
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: default_max_concurrent_documents(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Model override; falls back to the application's model when unset
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-call deadline for the LLM
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_generation_timeout_secs() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.timeout_secs == 0 {
            return Err(AppError::InvalidConfiguration(
                "generation.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::InvalidConfiguration(format!(
                "generation.temperature must lie in [0, 2], got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// A loaded document: plain extracted text plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier
    pub id: String,

    /// Label shown in citations (usually the file name)
    pub source: String,

    /// Where the text was loaded from, if it came from disk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Extracted text
    pub text: String,
}

impl Document {
    /// Create a document with a fresh identifier.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            path: None,
            text: text.into(),
        }
    }

    /// Record the file the text was extracted from.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// A contiguous passage of a document.
///
/// `start` and `end` are character offsets into the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning document
    pub document_id: String,

    /// Position within the document, starting at 0
    pub sequence: usize,

    pub start: usize,
    pub end: usize,

    pub text: String,
}

impl Chunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}

/// A chunk with its embedding, as stored in a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,

    /// Citation label of the owning document
    pub source: String,

    /// SHA-256 of the owning document's text
    pub content_hash: String,

    /// Embedding vector
    pub vector: Vec<f32>,
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub source: String,

    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// Ranked hits for one query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub hits: Vec<SearchHit>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Highest similarity, or 0 when there are no hits.
    pub fn top_score(&self) -> f32 {
        self.hits.first().map(|hit| hit.score).unwrap_or(0.0)
    }

    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|hit| hit.score).collect()
    }
}

/// A document that made it into the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedDocument {
    pub document_id: String,
    pub source: String,
    pub chunks: usize,
}

/// A document that could not be loaded or indexed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Source label or path of the document
    pub document: String,

    /// Rendered error
    pub error: String,
}

impl DocumentFailure {
    pub fn new(document: impl Into<String>, error: &AppError) -> Self {
        Self {
            document: document.into(),
            error: error.to_string(),
        }
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Documents added, in input order
    pub indexed: Vec<IndexedDocument>,

    /// Sources already present in the index with identical content
    pub skipped: Vec<String>,

    /// Documents that failed, in input order
    pub failures: Vec<DocumentFailure>,

    pub duration_secs: f64,
}

impl IngestReport {
    /// Number of chunks added across all documents.
    pub fn chunks_added(&self) -> usize {
        self.indexed.iter().map(|doc| doc.chunks).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Statistics for a knowledge base, persisted in `stats.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    pub base_name: String,

    pub documents_count: usize,

    pub chunks_count: usize,

    /// Index dimensionality, if anything has been indexed
    pub dimension: Option<usize>,

    /// Size of `index.json` in bytes
    pub index_size_bytes: u64,

    /// Embedding settings the index was built with
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,

    pub last_ingest_at: Option<DateTime<Utc>>,
}
