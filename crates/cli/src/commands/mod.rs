//! Command handlers for the docqa CLI.

pub mod ask;
pub mod chat;
pub mod clean;
pub mod ingest;
pub mod search;
pub mod stats;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use clean::CleanCommand;
pub use ingest::IngestCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;

use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::Answer;
use docqa_llm::{create_client, ClientSettings, LlmClient};
use std::sync::Arc;

/// Build the LLM client for the configured provider.
pub(crate) fn llm_client(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    config.validate()?;

    let provider = config.provider.as_str();
    let settings = ClientSettings {
        endpoint: config.provider_endpoint(provider),
        api_key: config.resolve_api_key(provider),
        api_version: config.provider_api_version(provider),
        timeout_secs: config.provider_timeout_secs(provider),
    };

    create_client(provider, &settings)
}

/// Print an answer followed by its sources.
pub(crate) fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);

    if answer.sources.is_empty() {
        return;
    }

    println!();
    println!("Sources:");
    for source in &answer.sources {
        println!("- {} (relevance {:.2})", source.source, source.relevance);
    }

    tracing::debug!(
        "confidence={:.2} chunks={} tokens={} time={:.2}s",
        answer.confidence,
        answer.retrieved_chunks,
        answer.usage.total_tokens,
        answer.response_time_secs
    );
}
