//! Error types for DocQA.
//!
//! This module defines a unified error enum that covers the retrieval
//! taxonomy (configuration, empty input, dimension mismatch, empty index,
//! upstream timeout/failure) as well as the ambient I/O, LLM, prompt and
//! serialization categories.

use thiserror::Error;

/// Unified error type for DocQA.
///
/// All functions in the workspace return `Result<T, AppError>`.
/// Library code never panics; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad chunk/overlap sizing, unknown providers, unreadable config files
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Empty text handed to the embedding provider
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Vector length inconsistent with the index dimensionality
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query issued against an index with no entries
    #[error("Empty index: {0}")]
    EmptyIndex(String),

    /// An embedding or LLM call did not finish in time
    #[error("Upstream timeout: {operation} exceeded {timeout_ms}ms")]
    UpstreamTimeout { operation: String, timeout_ms: u64 },

    /// An embedding or LLM call failed after all retries
    #[error("Upstream failure: {operation}: {message}")]
    UpstreamFailure { operation: String, message: String },

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM and embedding provider transport errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base errors (loading, persistence, bookkeeping)
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the failed call may succeed if issued again.
    ///
    /// Embedding and search are idempotent, so upstream errors are safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UpstreamTimeout { .. } | AppError::UpstreamFailure { .. } | AppError::Llm(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::UpstreamTimeout {
            operation: "embed".to_string(),
            timeout_ms: 10
        }
        .is_retryable());
        assert!(AppError::Llm("connection reset".to_string()).is_retryable());
        assert!(!AppError::EmptyInput("text".to_string()).is_retryable());
        assert!(!AppError::DimensionMismatch {
            expected: 3,
            actual: 4
        }
        .is_retryable());
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 384, got 768");
    }
}
