//! Ingestion coordinator: documents in, populated index out.
//!
//! Each document is chunked and embedded independently, up to
//! `max_concurrent_documents` at a time. Results are applied to the index in
//! input order, one write lock per document. A document that fails is
//! recorded in the report and the rest carry on.

use crate::chunker::Chunker;
use crate::embeddings::Embedder;
use crate::progress::ProgressReporter;
use crate::shared_index::{AddOutcome, SharedIndex};
use crate::types::{
    Chunk, Document, DocumentFailure, EmbeddedChunk, IndexedDocument, IngestConfig, IngestReport,
};
use docqa_core::{AppError, AppResult};
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;

/// Hex SHA-256 of a document's text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

enum Prepared {
    Ready {
        document_id: String,
        source: String,
        entries: Vec<EmbeddedChunk>,
    },
    Duplicate(String),
    Failed(DocumentFailure),
}

/// Builds index entries from documents.
#[derive(Debug, Clone)]
pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<Embedder>,
    index: SharedIndex,
    max_concurrent_documents: usize,
    progress: ProgressReporter,
}

impl Ingestor {
    pub fn new(
        chunker: Chunker,
        embedder: Arc<Embedder>,
        index: SharedIndex,
        config: &IngestConfig,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            max_concurrent_documents: config.max_concurrent_documents.max(1),
            progress: ProgressReporter::noop(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Chunk, embed and index `documents`, isolating per-document failures.
    pub async fn ingest(&self, documents: Vec<Document>) -> IngestReport {
        let start = Instant::now();
        let total = documents.len() as u64;

        tracing::info!(
            "Ingesting {} documents (chunk_size={}, overlap={}, concurrency={})",
            total,
            self.chunker.chunk_size(),
            self.chunker.overlap(),
            self.max_concurrent_documents
        );

        let prepared = stream::iter(documents.into_iter().enumerate())
            .map(|(position, document)| self.prepare(position as u64 + 1, total, document))
            .buffered(self.max_concurrent_documents);
        let mut prepared = std::pin::pin!(prepared);

        let mut report = IngestReport::default();
        let mut applied = 0u64;

        while let Some(outcome) = prepared.next().await {
            applied += 1;

            match outcome {
                Prepared::Ready {
                    document_id,
                    source,
                    entries,
                } => match self.index.add_document(entries).await {
                    Ok(AddOutcome::Added(chunks)) => {
                        tracing::debug!("Indexed {} ({} chunks)", source, chunks);
                        self.progress.index(applied, Some(total));
                        report.indexed.push(IndexedDocument {
                            document_id,
                            source,
                            chunks,
                        });
                    }
                    Ok(AddOutcome::Duplicate) => {
                        tracing::info!("Skipping {}: identical content already indexed", source);
                        report.skipped.push(source);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to index {}: {}", source, e);
                        report.failures.push(DocumentFailure::new(source, &e));
                    }
                },
                Prepared::Duplicate(source) => {
                    tracing::info!("Skipping {}: identical content already indexed", source);
                    report.skipped.push(source);
                }
                Prepared::Failed(failure) => report.failures.push(failure),
            }
        }

        report.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Ingestion completed: {} indexed ({} chunks), {} skipped, {} failed in {:.2}s",
            report.indexed.len(),
            report.chunks_added(),
            report.skipped.len(),
            report.failures.len(),
            report.duration_secs
        );

        report
    }

    async fn prepare(&self, position: u64, total: u64, document: Document) -> Prepared {
        let source = document.source.clone();
        let hash = content_hash(&document.text);

        // Cheap early skip; the authoritative check happens under the write lock
        if self.index.contains_document(&hash).await {
            return Prepared::Duplicate(source);
        }

        match self.embed_document(position, total, &document, &hash).await {
            Ok(entries) => Prepared::Ready {
                document_id: document.id,
                source,
                entries,
            },
            Err(e) => {
                tracing::warn!("Failed to ingest {}: {}", source, e);
                Prepared::Failed(DocumentFailure::new(source, &e))
            }
        }
    }

    async fn embed_document(
        &self,
        position: u64,
        total: u64,
        document: &Document,
        hash: &str,
    ) -> AppResult<Vec<EmbeddedChunk>> {
        if document.text.trim().is_empty() {
            return Err(AppError::EmptyInput("no extractable text".to_string()));
        }

        let chunks: Vec<Chunk> = self.chunker.chunk(document).collect();
        self.progress
            .chunk(position, Some(total), &document.source, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        self.progress
            .embed(position, Some(total), self.embedder.model_name());

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk {
                chunk,
                source: document.source.clone(),
                content_hash: hash.to_string(),
                vector,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::embeddings::EmbeddingConfig;
    use crate::flat_index::FlatIndex;
    use crate::vector_index::VectorIndex;

    fn ingestor(index: &SharedIndex) -> Ingestor {
        let config = EmbeddingConfig {
            dimensions: 64,
            ..Default::default()
        };
        let embedder = Embedder::new(Arc::new(MockProvider::new(64)), &config).unwrap();
        Ingestor::new(
            Chunker::new(40, 10).unwrap(),
            Arc::new(embedder),
            index.clone(),
            &IngestConfig::default(),
        )
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_ingest_preserves_document_then_sequence_order() {
        let index = SharedIndex::new(FlatIndex::new());
        let documents = vec![
            Document::new("one.txt", "Alpha beta gamma delta epsilon zeta eta theta iota kappa."),
            Document::new("two.txt", "Lambda mu nu xi omicron pi rho sigma tau upsilon phi."),
            Document::new("three.txt", "Short text."),
        ];

        let report = ingestor(&index).ingest(documents).await;
        assert!(!report.has_failures());

        let sources: Vec<&str> = report.indexed.iter().map(|d| d.source.as_str()).collect();
        assert_eq!(sources, vec!["one.txt", "two.txt", "three.txt"]);

        let snapshot = FlatIndex::deserialize(&index.snapshot().await.unwrap()).unwrap();
        let order: Vec<(String, usize)> = snapshot
            .entries()
            .iter()
            .map(|e| (e.source.clone(), e.chunk.sequence))
            .collect();
        let mut expected = Vec::new();
        for doc in &report.indexed {
            for sequence in 0..doc.chunks {
                expected.push((doc.source.clone(), sequence));
            }
        }
        assert_eq!(order, expected);
        assert_eq!(report.chunks_added(), snapshot.len());
    }

    #[tokio::test]
    async fn test_empty_document_reported_as_failure() {
        let index = SharedIndex::new(FlatIndex::new());
        let documents = vec![
            Document::new("blank.pdf", "   \n  "),
            Document::new("ok.txt", "Some real content here."),
        ];

        let report = ingestor(&index).ingest(documents).await;

        assert_eq!(report.indexed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].document, "blank.pdf");
        assert!(report.failures[0].error.contains("no extractable text"));
    }

    #[tokio::test]
    async fn test_reingesting_identical_content_is_skipped() {
        let index = SharedIndex::new(FlatIndex::new());
        let ingestor = ingestor(&index);

        ingestor
            .ingest(vec![Document::new("a.txt", "Same content twice.")])
            .await;
        let report = ingestor
            .ingest(vec![
                Document::new("copy-of-a.txt", "Same content twice."),
                Document::new("a.txt", "Same content twice."),
            ])
            .await;

        assert!(report.indexed.is_empty());
        assert_eq!(report.skipped, vec!["copy-of-a.txt", "a.txt"]);
        assert_eq!(index.document_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_run_index_once() {
        let index = SharedIndex::new(FlatIndex::new());
        let report = ingestor(&index)
            .ingest(vec![
                Document::new("first.txt", "Repeated body text."),
                Document::new("second.txt", "Repeated body text."),
            ])
            .await;

        assert_eq!(report.indexed.len(), 1);
        assert_eq!(report.indexed[0].source, "first.txt");
        assert_eq!(report.skipped, vec!["second.txt"]);
    }
}
