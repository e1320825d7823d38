//! Concurrent access to a vector index.
//!
//! Searches take a read lock and run in parallel; ingestion takes the write
//! lock only for the final append, after all embedding work is done. A
//! reader therefore sees either none or all of a document's chunks.

use crate::types::{EmbeddedChunk, SearchHit};
use crate::vector_index::VectorIndex;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Result of [`SharedIndex::add_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The document's chunks were appended
    Added(usize),
    /// A document with the same content hash was already present
    Duplicate,
}

/// Cloneable handle to one index shared by readers and writers.
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<RwLock<Box<dyn VectorIndex>>>,
}

impl std::fmt::Debug for SharedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedIndex").finish_non_exhaustive()
    }
}

impl SharedIndex {
    pub fn new(index: impl VectorIndex + 'static) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Box::new(index))),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn dimension(&self) -> Option<usize> {
        self.inner.read().await.dimension()
    }

    pub async fn document_count(&self) -> usize {
        self.inner.read().await.document_count()
    }

    pub async fn contains_document(&self, content_hash: &str) -> bool {
        self.inner.read().await.contains_document(content_hash)
    }

    /// Top-`k` search under a read lock.
    pub async fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        self.inner.read().await.search(query, k)
    }

    /// Append all chunks of one document, unless its content is already indexed.
    ///
    /// The duplicate check and the append happen under the same write lock.
    pub async fn add_document(&self, entries: Vec<EmbeddedChunk>) -> AppResult<AddOutcome> {
        let Some(content_hash) = entries.first().map(|e| e.content_hash.clone()) else {
            return Err(AppError::EmptyInput("document produced no chunks".to_string()));
        };

        if entries.iter().any(|e| e.content_hash != content_hash) {
            return Err(AppError::Knowledge(
                "chunks of one document must share a content hash".to_string(),
            ));
        }

        let mut index = self.inner.write().await;
        if index.contains_document(&content_hash) {
            return Ok(AddOutcome::Duplicate);
        }

        let count = entries.len();
        index.add_batch(entries)?;
        Ok(AddOutcome::Added(count))
    }

    /// Serialized snapshot taken under a read lock.
    pub async fn snapshot(&self) -> AppResult<Vec<u8>> {
        self.inner.read().await.serialize()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}
