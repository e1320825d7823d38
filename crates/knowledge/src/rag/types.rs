//! Answer types.

use crate::types::SearchHit;
use docqa_llm::LlmUsage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Top scores below this trigger cautious language in the prompt.
pub const CONFIDENCE_THRESHOLD: f32 = 0.30;

/// Hits averaged into [`Answer::confidence`].
const CONFIDENCE_TOP_N: usize = 3;

/// A document an answer drew on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source label (file name)
    pub source: String,

    /// Best similarity among this source's hits, rounded to 2 places
    pub relevance: f32,
}

impl SourceRef {
    /// One entry per source, in rank order, keeping each source's best hit.
    pub fn from_hits(hits: &[SearchHit]) -> Vec<SourceRef> {
        let mut seen = HashSet::new();
        hits.iter()
            .filter(|hit| seen.insert(hit.source.as_str()))
            .map(|hit| SourceRef {
                source: hit.source.clone(),
                relevance: round2(hit.score),
            })
            .collect()
    }
}

/// A generated (or declined) answer with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,

    pub sources: Vec<SourceRef>,

    /// Number of passages handed to the model
    pub retrieved_chunks: usize,

    /// Mean similarity of the top three hits, rounded to 2 places
    pub confidence: f32,

    /// Model that produced the answer; empty when no model was called
    pub model: String,

    pub usage: LlmUsage,

    pub response_time_secs: f64,

    /// Whether the answer was generated from retrieved passages
    pub grounded: bool,
}

impl Answer {
    /// Explicit answer for when retrieval found nothing usable.
    pub fn insufficient_information(query: &str) -> Self {
        Self {
            answer: format!(
                "I could not find information about \"{}\" in the available documents.",
                query
            ),
            sources: Vec::new(),
            retrieved_chunks: 0,
            confidence: 0.0,
            model: String::new(),
            usage: LlmUsage::default(),
            response_time_secs: 0.0,
            grounded: false,
        }
    }
}

/// Mean of the first three scores, rounded to 2 places; 0 when empty.
pub fn confidence(scores: &[f32]) -> f32 {
    let top = &scores[..scores.len().min(CONFIDENCE_TOP_N)];
    if top.is_empty() {
        return 0.0;
    }
    round2(top.iter().sum::<f32>() / top.len() as f32)
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
