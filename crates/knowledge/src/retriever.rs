//! Query-time retrieval: embed, search, render a bounded context block.

use crate::embeddings::Embedder;
use crate::shared_index::SharedIndex;
use crate::types::{RetrievalResult, SearchHit};
use docqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BLOCK_SEPARATOR: &str = "\n---\n";

const SENTENCE_BREAKS: [&str; 4] = [". ", "! ", "? ", "\n\n"];

/// Retrieved passages rendered for a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedContext {
    pub text: String,

    /// Hits that made it into `text`, counted from the best one
    pub chunks_used: usize,

    /// Whether some retrieved text was left out to respect the budget
    pub truncated: bool,
}

/// Output of [`Retriever::retrieve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    pub result: RetrievalResult,
    pub context: RenderedContext,
}

/// Turns a query into ranked hits over a shared index.
#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Arc<Embedder>,
    index: SharedIndex,
    min_score: Option<f32>,
}

impl Retriever {
    pub fn new(embedder: Arc<Embedder>, index: SharedIndex) -> Self {
        Self {
            embedder,
            index,
            min_score: None,
        }
    }

    /// Drop hits scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    /// Ranked hits for `query`, best first, without rendering.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        if self.index.is_empty().await {
            return Err(AppError::EmptyIndex(
                "no documents have been ingested".to_string(),
            ));
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let hits = self.index.search(&query_vector, k).await?;
        let found = hits.len();

        let hits: Vec<SearchHit> = match self.min_score {
            Some(min_score) => hits.into_iter().filter(|h| h.score >= min_score).collect(),
            None => hits,
        };

        if hits.len() < found {
            tracing::debug!(
                "Dropped {} of {} hits below min_score {:?}",
                found - hits.len(),
                found,
                self.min_score
            );
        }

        Ok(RetrievalResult { hits })
    }

    /// Retrieve up to `k` passages and render them within `max_context_chars`.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        max_context_chars: usize,
    ) -> AppResult<Retrieval> {
        let result = self.search(query, k).await?;
        let context = render_context(&result.hits, max_context_chars);

        tracing::info!(
            hits = result.len(),
            top_score = result.top_score(),
            chunks_used = context.chunks_used,
            truncated = context.truncated,
            "Retrieval complete"
        );

        Ok(Retrieval { result, context })
    }
}

/// Render hits as numbered source blocks, stopping at a block boundary once
/// the character budget is reached.
pub fn render_context(hits: &[SearchHit], max_chars: usize) -> RenderedContext {
    let separator_chars = BLOCK_SEPARATOR.chars().count();
    let mut context = RenderedContext::default();
    let mut used = 0;

    for (i, hit) in hits.iter().enumerate() {
        let header = format!("[Source {}: {}]\n", i + 1, hit.source);
        let block = format!("{}{}\n", header, hit.chunk.text);
        let block_chars = block.chars().count();

        if context.chunks_used == 0 {
            if block_chars <= max_chars {
                context.text.push_str(&block);
                used = block_chars;
                context.chunks_used = 1;
                continue;
            }

            // Nothing fits whole; keep as much of the best passage as we can
            context.truncated = true;
            if let Some(cut) = cut_block(&block, header.len(), max_chars) {
                context.text = cut;
                context.chunks_used = 1;
            }
            break;
        }

        if used + separator_chars + block_chars > max_chars {
            context.truncated = true;
            break;
        }

        context.text.push_str(BLOCK_SEPARATOR);
        context.text.push_str(&block);
        used += separator_chars + block_chars;
        context.chunks_used += 1;
    }

    context
}

/// First `max_chars` characters of `block`, ending at a sentence break when
/// one exists after the header. `None` if not even the header fits.
fn cut_block(block: &str, header_bytes: usize, max_chars: usize) -> Option<String> {
    let end = block
        .char_indices()
        .nth(max_chars)
        .map(|(byte, _)| byte)
        .unwrap_or(block.len());
    if end <= header_bytes {
        return None;
    }

    let prefix = &block[..end];
    let body = &prefix[header_bytes..];
    let sentence_end = SENTENCE_BREAKS
        .iter()
        .filter_map(|brk| {
            body.rfind(brk).map(|pos| match *brk {
                "\n\n" => pos,
                _ => pos + 1,
            })
        })
        .filter(|&pos| pos > 0)
        .max();

    let cut = match sentence_end {
        Some(pos) => &prefix[..header_bytes + pos],
        None => prefix,
    };
    Some(cut.to_string())
}
