//! Embedding layer for knowledge bases.
//!
//! Providers implement [`EmbeddingProvider`]; the rest of the crate talks to
//! them through [`Embedder`], which enforces input rules, batching, bounded
//! concurrency, timeouts, retries and dimension checks.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use docqa_core::{retry_with_backoff, with_timeout, AppError, AppResult, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Adapter that every embedding call in the crate goes through.
#[derive(Debug, Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    semaphore: Arc<Semaphore>,
    /// Separate pool so queries never queue behind ingestion batches
    query_semaphore: Arc<Semaphore>,
    batch_size: usize,
    max_concurrent: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Embedder {
    /// Wrap a provider with the limits from `config`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> AppResult<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            query_semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            batch_size: config.batch_size,
            max_concurrent: config.max_concurrent_requests,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: config.retry,
        })
    }

    /// Build the configured provider and wrap it.
    pub async fn from_config(config: &EmbeddingConfig) -> AppResult<Self> {
        let provider = create_provider(config).await?;
        Self::new(provider, config)
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Vector length every embedding has.
    pub fn dimension(&self) -> usize {
        self.provider.dimensions()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Provider calls currently allowed to start.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Embed one non-empty text.
    pub async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.is_empty() {
            return Err(AppError::EmptyInput("cannot embed empty text".to_string()));
        }

        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| AppError::UpstreamFailure {
            operation: "embed".to_string(),
            message: "no embedding returned".to_string(),
        })
    }

    /// Embed a search query.
    ///
    /// Same result as [`Embedder::embed`], but drawn from the query permit
    /// pool so a long ingestion does not delay searches.
    pub async fn embed_query(&self, text: &str) -> AppResult<Vec<f32>> {
        if text.is_empty() {
            return Err(AppError::EmptyInput("cannot embed empty query".to_string()));
        }

        let mut vectors = self
            .embed_provider_batch(&[text.to_string()], &self.query_semaphore)
            .await?;
        vectors.pop().ok_or_else(|| AppError::UpstreamFailure {
            operation: "embed query".to_string(),
            message: "no embedding returned".to_string(),
        })
    }

    /// Embed many texts; the result has one vector per input, in order.
    ///
    /// Equivalent to calling [`Embedder::embed`] on each text in turn.
    pub async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if let Some(index) = texts.iter().position(|t| t.is_empty()) {
            return Err(AppError::EmptyInput(format!(
                "cannot embed empty text (item {} of {})",
                index + 1,
                texts.len()
            )));
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "Embedding {} texts with {} ({}) in batches of {}",
            texts.len(),
            self.provider.provider_name(),
            self.provider.model_name(),
            self.batch_size
        );

        let batches = texts
            .chunks(self.batch_size)
            .map(|batch| self.embed_provider_batch(batch, &self.semaphore));
        let results = futures::future::try_join_all(batches).await?;

        Ok(results.into_iter().flatten().collect())
    }

    async fn embed_provider_batch(
        &self,
        batch: &[String],
        semaphore: &Semaphore,
    ) -> AppResult<Vec<Vec<f32>>> {
        let operation = format!("{} embed", self.provider.provider_name());
        let op = operation.as_str();
        let provider = &self.provider;
        let timeout = self.timeout;

        // The permit is taken per attempt so backoff sleeps do not hold it
        let vectors = retry_with_backoff(&self.retry, op, || async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| AppError::Other(format!("embedding semaphore closed: {}", e)))?;

            with_timeout(op, timeout, provider.embed_batch(batch)).await
        })
        .await?;

        if vectors.len() != batch.len() {
            return Err(AppError::UpstreamFailure {
                operation,
                message: format!(
                    "provider returned {} embeddings for {} texts",
                    vectors.len(),
                    batch.len()
                ),
            });
        }

        let expected = self.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(AppError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        // NaN and infinities cannot be ranked or written to the snapshot
        if let Some(position) = vectors
            .iter()
            .position(|v| v.iter().any(|x| !x.is_finite()))
        {
            return Err(AppError::UpstreamFailure {
                operation,
                message: format!(
                    "provider returned a non-finite embedding for text {} of the batch",
                    position
                ),
            });
        }

        Ok(vectors)
    }
}
