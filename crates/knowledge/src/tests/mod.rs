//! Cross-module scenarios: ranking, ingestion, persistence and concurrency.


use crate::embeddings::providers::mock::MockProvider;
use crate::embeddings::{Embedder, EmbeddingConfig, EmbeddingProvider};
use docqa_core::{AppError, AppResult, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DIMS: usize = 128;

pub(crate) fn embedding_config(dimensions: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        dimensions,
        retry: RetryPolicy {
            max_attempts: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
        },
        ..Default::default()
    }
}

pub(crate) fn mock_embedder() -> Arc<Embedder> {
    let embedder = Embedder::new(Arc::new(MockProvider::new(DIMS)), &embedding_config(DIMS))
        .expect("valid embedder");
    Arc::new(embedder)
}

/// Maps each known keyword to its own axis, so rankings are predictable.
#[derive(Debug)]
pub(crate) struct KeywordProvider {
    keywords: Vec<&'static str>,
}

impl KeywordProvider {
    pub(crate) fn new(keywords: &[&'static str]) -> Self {
        Self {
            keywords: keywords.to_vec(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect()
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-v1"
    }

    fn dimensions(&self) -> usize {
        self.keywords.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Mock vectors, except any batch containing `marker` fails upstream
/// (or, with `returning_nan`, comes back full of NaN).
#[derive(Debug)]
pub(crate) struct PoisonedProvider {
    inner: MockProvider,
    marker: &'static str,
    delay: Duration,
    nan: bool,
}

impl PoisonedProvider {
    pub(crate) fn new(marker: &'static str) -> Self {
        Self {
            inner: MockProvider::new(DIMS),
            marker,
            delay: Duration::ZERO,
            nan: false,
        }
    }

    pub(crate) fn returning_nan(mut self) -> Self {
        self.nan = true;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for PoisonedProvider {
    fn provider_name(&self) -> &str {
        "poisoned"
    }

    fn model_name(&self) -> &str {
        "poisoned-v1"
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.nan && texts.iter().any(|t| t.contains(self.marker)) {
            return Ok(texts.iter().map(|_| vec![f32::NAN; DIMS]).collect());
        }
        if texts.iter().any(|t| t.contains(self.marker)) {
            return Err(AppError::UpstreamFailure {
                operation: "poisoned embed".to_string(),
                message: "provider returned 503".to_string(),
            });
        }
        self.inner.embed_batch(texts).await
    }
}
