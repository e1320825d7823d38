//! Brute-force in-memory vector index.

use crate::types::{EmbeddedChunk, SearchHit};
use crate::vector_index::{cosine_similarity, VectorIndex};
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Snapshot format version written by [`FlatIndex::serialize`].
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    dimension: Option<usize>,
    entries: &'a [EmbeddedChunk],
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    dimension: Option<usize>,
    entries: Vec<EmbeddedChunk>,
}

/// Ordered collection of embedded chunks searched with an O(N·D) scan.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimension: Option<usize>,
    entries: Vec<EmbeddedChunk>,
    documents: HashSet<String>,
}

impl FlatIndex {
    /// Empty index whose dimension is fixed by the first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty index with a known dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::default()
        }
    }

    /// Rebuild an index from [`VectorIndex::serialize`] output.
    pub fn deserialize(bytes: &[u8]) -> AppResult<Self> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AppError::InvalidConfiguration(format!(
                "Unsupported index snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut index = match snapshot.dimension {
            Some(dimension) => Self::with_dimension(dimension),
            None => Self::new(),
        };
        index.add_batch(snapshot.entries)?;

        Ok(index)
    }

    /// Dimension `entry` must have, or an error if it conflicts.
    ///
    /// Vectors must be non-empty and finite so they survive a snapshot.
    fn check_vector(expected: Option<usize>, entry: &EmbeddedChunk) -> AppResult<usize> {
        let actual = entry.vector.len();
        if actual == 0 {
            return Err(AppError::EmptyInput(format!(
                "chunk {} of document {} has an empty vector",
                entry.chunk.sequence, entry.chunk.document_id
            )));
        }

        if entry.vector.iter().any(|x| !x.is_finite()) {
            return Err(AppError::Knowledge(format!(
                "chunk {} of document {} has a non-finite vector component",
                entry.chunk.sequence, entry.chunk.document_id
            )));
        }

        match expected {
            Some(expected) if expected != actual => {
                Err(AppError::DimensionMismatch { expected, actual })
            }
            _ => Ok(actual),
        }
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn add(&mut self, entry: EmbeddedChunk) -> AppResult<()> {
        let dimension = Self::check_vector(self.dimension, &entry)?;
        self.dimension = Some(dimension);
        self.documents.insert(entry.content_hash.clone());
        self.entries.push(entry);
        Ok(())
    }

    fn add_batch(&mut self, entries: Vec<EmbeddedChunk>) -> AppResult<()> {
        // Validate everything before touching state
        let mut dimension = self.dimension;
        for entry in &entries {
            dimension = Some(Self::check_vector(dimension, entry)?);
        }

        self.dimension = dimension;
        self.documents
            .extend(entries.iter().map(|e| e.content_hash.clone()));
        self.entries.extend(entries);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }

        if k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.vector)))
            .collect();

        // Scores are finite, so total_cmp agrees with numeric order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| {
                let entry = &self.entries[position];
                SearchHit {
                    chunk: entry.chunk.clone(),
                    source: entry.source.clone(),
                    score,
                }
            })
            .collect())
    }

    fn entries(&self) -> &[EmbeddedChunk] {
        &self.entries
    }

    fn contains_document(&self, content_hash: &str) -> bool {
        self.documents.contains(content_hash)
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn clear(&mut self) {
        *self = Self::new();
    }

    fn serialize(&self) -> AppResult<Vec<u8>> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            dimension: self.dimension,
            entries: &self.entries,
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }
}
