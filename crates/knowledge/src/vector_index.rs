//! Vector index abstraction for embedded chunks.
//!
//! Defines a trait for swappable index backends. [`FlatIndex`](crate::flat_index::FlatIndex)
//! is the brute-force baseline; an approximate structure can replace it
//! behind the same `add`/`search` contract.

use crate::types::{EmbeddedChunk, SearchHit};
use docqa_core::AppResult;

/// Trait for vector index backends.
///
/// Implementations must:
/// - fix the dimension with the first vector added and reject others
/// - rank `search` results by descending cosine similarity, breaking ties
///   by insertion order (earlier wins)
/// - apply `add_batch` atomically: every entry is added or none is
pub trait VectorIndex: Send + Sync {
    /// Dimension shared by every stored vector, once established.
    fn dimension(&self) -> Option<usize>;

    /// Number of stored chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one chunk.
    fn add(&mut self, entry: EmbeddedChunk) -> AppResult<()>;

    /// Append a group of chunks all-or-nothing.
    fn add_batch(&mut self, entries: Vec<EmbeddedChunk>) -> AppResult<()>;

    /// Return up to `k` chunks most similar to `query`, best first.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>>;

    /// Stored chunks in insertion order.
    fn entries(&self) -> &[EmbeddedChunk];

    /// Whether a document with this content hash is already indexed.
    fn contains_document(&self, content_hash: &str) -> bool;

    /// Number of distinct documents stored.
    fn document_count(&self) -> usize;

    /// Remove everything, including the established dimension.
    fn clear(&mut self);

    /// Encode the full ordered contents.
    fn serialize(&self) -> AppResult<Vec<u8>>;
}

/// Cosine similarity of two vectors.
///
/// Returns 0 when either vector has zero norm, the lengths differ, or the
/// arithmetic is not finite. Otherwise the result is clamped to [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_finite() {
        score.clamp(-1.0, 1.0) as f32
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn test_zero_norm_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let vectors: [[f32; 4]; 5] = [
            [1.0, 0.5, 0.2, 0.1],
            [-0.3, -0.8, 0.4, -0.2],
            [1e-20, 3e-20, 0.0, 1e-20],
            [3.4e38, 1.0, -3.4e38, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ];

        for a in &vectors {
            for b in &vectors {
                let ab = cosine_similarity(a, b);
                let ba = cosine_similarity(b, a);
                assert_eq!(ab.to_bits(), ba.to_bits());
                assert!((-1.0..=1.0).contains(&ab), "{ab} out of range");
            }
        }
    }
}
