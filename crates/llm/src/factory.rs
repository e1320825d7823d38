//! LLM provider factory.
//!
//! Resolves a provider name to a concrete client, injecting the endpoint,
//! API key and provider overrides the caller resolved from configuration.

use crate::client::LlmClient;
use crate::providers::{ClaudeClient, OllamaClient};
use crate::types::ProviderType;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Connection settings resolved from configuration for one provider.
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// API key (required for Claude)
    pub api_key: Option<String>,

    /// `anthropic-version` header override (Claude)
    pub api_version: Option<String>,

    /// HTTP request timeout in seconds (Ollama)
    pub timeout_secs: Option<u64>,
}

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("claude", "anthropic", "ollama")
/// * `settings` - Endpoint, key and per-provider overrides
///
/// # Errors
/// Returns `InvalidConfiguration` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(provider: &str, settings: &ClientSettings) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider).ok_or_else(|| {
        AppError::InvalidConfiguration(format!(
            "Unknown provider: {}. Supported: claude, ollama",
            provider
        ))
    })?;

    tracing::debug!(
        "Creating LLM client: provider={}, endpoint={:?}",
        provider_type.as_str(),
        settings.endpoint
    );

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(build_ollama(settings)?)),
        ProviderType::Claude => Ok(Arc::new(build_claude(settings)?)),
    }
}

fn build_ollama(settings: &ClientSettings) -> AppResult<OllamaClient> {
    let client = match settings.endpoint.as_deref() {
        Some(url) => OllamaClient::with_base_url(url),
        None => OllamaClient::new(),
    };

    match settings.timeout_secs {
        Some(secs) => client.with_timeout(Duration::from_secs(secs)),
        None => Ok(client),
    }
}

fn build_claude(settings: &ClientSettings) -> AppResult<ClaudeClient> {
    let key = settings.api_key.as_deref().ok_or_else(|| {
        AppError::InvalidConfiguration("Claude provider requires API key".to_string())
    })?;

    let client = match settings.endpoint.as_deref() {
        Some(url) => ClaudeClient::with_base_url(url, key),
        None => ClaudeClient::new(key),
    };

    Ok(match settings.api_version.as_deref() {
        Some(version) => client.with_api_version(version),
        None => client,
    })
}
