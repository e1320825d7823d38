//! Embedding configuration types.

use docqa_core::{AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Embedding configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding vector dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Maximum texts per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Provider endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Provider requests allowed in flight at once
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Deadline for a single provider request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            endpoint: None,
            max_concurrent_requests: default_max_concurrent_requests(),
            timeout_secs: default_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingConfig {
    /// Reject settings that would stall or mis-size the embedder.
    pub fn validate(&self) -> AppResult<()> {
        let zero_field = [
            ("dimensions", self.dimensions == 0),
            ("batch_size", self.batch_size == 0),
            ("max_concurrent_requests", self.max_concurrent_requests == 0),
            ("timeout_secs", self.timeout_secs == 0),
        ]
        .into_iter()
        .find(|(_, is_zero)| *is_zero);

        if let Some((field, _)) = zero_field {
            return Err(AppError::InvalidConfiguration(format!(
                "embedding.{} must be greater than zero",
                field
            )));
        }

        Ok(())
    }

    /// Validate that an index built with `other` can be searched with `self`.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.provider != other.provider {
            return Err(AppError::InvalidConfiguration(format!(
                "Provider mismatch: index built with '{}', configured '{}'",
                other.provider, self.provider
            )));
        }

        if self.model != other.model {
            return Err(AppError::InvalidConfiguration(format!(
                "Model mismatch: index built with '{}', configured '{}'",
                other.model, self.model
            )));
        }

        if self.dimensions != other.dimensions {
            return Err(AppError::DimensionMismatch {
                expected: other.dimensions,
                actual: self.dimensions,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.batch_size, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_fields_rejected() {
        let config = EmbeddingConfig {
            max_concurrent_requests: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent_requests"));
    }

    #[test]
    fn test_yaml_overrides() {
        let config: EmbeddingConfig = serde_yaml::from_str(
            "provider: ollama\nmodel: nomic-embed-text\ndimensions: 768\nendpoint: http://gpu:11434\n",
        )
        .unwrap();

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.dimensions, 768);
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu:11434"));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_validate_consistency_success() {
        let config = EmbeddingConfig::default();
        let tuned = EmbeddingConfig {
            batch_size: 8,
            ..config.clone()
        };
        assert!(config.validate_consistency(&tuned).is_ok());
    }

    #[test]
    fn test_validate_consistency_provider_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            provider: "ollama".to_string(),
            ..config1.clone()
        };

        let err = config1.validate_consistency(&config2).unwrap_err();
        assert!(err.to_string().contains("Provider mismatch"));
    }

    #[test]
    fn test_validate_consistency_dimension_mismatch() {
        let config1 = EmbeddingConfig::default();
        let config2 = EmbeddingConfig {
            dimensions: 768,
            ..config1.clone()
        };

        assert!(matches!(
            config1.validate_consistency(&config2),
            Err(AppError::DimensionMismatch {
                expected: 768,
                actual: 384
            })
        ));
    }
}
