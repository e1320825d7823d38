//! DocQA Core Library
//!
//! This crate provides the foundational utilities shared by the DocQA crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - Retry and timeout helpers for upstream calls

pub mod config;
pub mod error;
pub mod logging;
pub mod retry;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use retry::{retry_with_backoff, with_timeout, RetryPolicy};
