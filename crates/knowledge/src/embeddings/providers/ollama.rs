//! Ollama embedding provider.
//!
//! Uses the batch endpoint (`POST /api/embed`) with models such as
//! `nomic-embed-text`. Timeouts and retries are applied by the
//! [`Embedder`](crate::embeddings::Embedder) adapter, not here.
//!
//! # Example
//! ```no_run
//! use docqa_knowledge::embeddings::{EmbeddingConfig, EmbeddingProvider};
//! use docqa_knowledge::embeddings::providers::ollama::OllamaProvider;
//!
//! # async fn example() -> docqa_core::AppResult<()> {
//! let config = EmbeddingConfig {
//!     provider: "ollama".to_string(),
//!     model: "nomic-embed-text".to_string(),
//!     dimensions: 768,
//!     ..Default::default()
//! };
//!
//! let provider = OllamaProvider::connect(&config).await?;
//! let embedding = provider.embed("Hello world").await?;
//! assert_eq!(embedding.len(), 768);
//! # Ok(())
//! # }
//! ```

use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use docqa_core::{with_timeout, AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default local Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const EMBED_ENDPOINT: &str = "/api/embed";

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

impl OllamaProvider {
    /// Create a provider without contacting the server.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimensions,
        }
    }

    /// Create a provider and verify the model's dimension against `config`.
    pub async fn connect(config: &EmbeddingConfig) -> AppResult<Self> {
        let base_url = config.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
        let provider = Self::new(base_url, &config.model, config.dimensions);

        let detected = provider
            .detect_dimensions(Duration::from_secs(config.timeout_secs))
            .await?;
        if detected != config.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: config.dimensions,
                actual: detected,
            });
        }

        debug!("Ollama model '{}' ready ({} dims)", provider.model, detected);
        Ok(provider)
    }

    /// Embed a fixed string and report the vector length the model returns.
    #[instrument(skip(self), fields(model = %self.model))]
    async fn detect_dimensions(&self, timeout: Duration) -> AppResult<usize> {
        debug!("Checking Ollama at {}", self.base_url);

        let sample = ["dimension check".to_string()];
        let mut vectors = with_timeout("ollama dimension check", timeout, self.request(&sample))
            .await
            .map_err(|e| match e {
                AppError::UpstreamFailure { message, .. } => AppError::UpstreamFailure {
                    operation: "ollama dimension check".to_string(),
                    message: format!(
                        "Ollama not available at {} ({}). Ensure Ollama is running and run: ollama pull {}",
                        self.base_url, message, self.model
                    ),
                },
                other => other,
            })?;

        vectors
            .pop()
            .map(|v| v.len())
            .ok_or_else(|| AppError::UpstreamFailure {
                operation: "ollama dimension check".to_string(),
                message: "no embedding returned".to_string(),
            })
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn request(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure {
                operation: "ollama embed".to_string(),
                message: format!("request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|r| r.error)
                .unwrap_or(error_text);

            // A missing model or malformed request will not fix itself
            if status.is_client_error() && status.as_u16() != 429 {
                return Err(AppError::InvalidConfiguration(format!(
                    "Ollama rejected embedding request ({}): {}",
                    status, message
                )));
            }

            return Err(AppError::UpstreamFailure {
                operation: "ollama embed".to_string(),
                message: format!("{}: {}", status, message),
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| AppError::UpstreamFailure {
            operation: "ollama embed".to_string(),
            message: format!("failed to parse response: {}", e),
        })?;

        debug!("Received {} embeddings", parsed.embeddings.len());
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation_trims_url() {
        let provider = OllamaProvider::new("http://localhost:11434/", "nomic-embed-text", 768);
        assert_eq!(provider.base_url, "http://localhost:11434");
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn test_request_body_shape() {
        let texts = vec!["first".to_string(), "second".to_string()];
        let body = serde_json::to_value(EmbedRequest {
            model: "nomic-embed-text",
            input: &texts,
        })
        .unwrap();

        assert_eq!(body["model"], "nomic-embed-text");
        assert_eq!(body["input"][1], "second");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: EmbedResponse = serde_json::from_str(
            r#"{"model":"nomic-embed-text","embeddings":[[0.1,0.2],[0.3,0.4]]}"#,
        )
        .unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1], vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_upstream_failure() {
        // Port 9 (discard) is closed on test machines
        let provider = OllamaProvider::new("http://127.0.0.1:9", "nomic-embed-text", 768);
        let err = provider
            .embed_batch(&["hello".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamFailure { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_request() {
        let provider = OllamaProvider::new("http://127.0.0.1:9", "nomic-embed-text", 768);
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
