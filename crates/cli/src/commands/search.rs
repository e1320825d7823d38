//! Search command handler.
//!
//! Retrieval only; no model is called.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::KnowledgeBase;

/// Show the passages most similar to a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Knowledge base name
    pub base: String,

    /// Query text
    pub query: String,

    /// Number of passages to return (overrides the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command for base '{}'", self.base);

        let base = KnowledgeBase::open(&config.workspace, &self.base).await?;
        let k = self.top_k.unwrap_or(base.config().top_k);
        let result = base.search(&self.query, k).await?;

        if self.json {
            let hits: Vec<_> = result
                .hits
                .iter()
                .map(|hit| {
                    serde_json::json!({
                        "source": hit.source,
                        "sequence": hit.chunk.sequence,
                        "start": hit.chunk.start,
                        "end": hit.chunk.end,
                        "score": hit.score,
                        "text": hit.chunk.text,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&hits)?);
            return Ok(());
        }

        if result.is_empty() {
            println!("No passages matched.");
            return Ok(());
        }

        for (i, hit) in result.hits.iter().enumerate() {
            println!(
                "[{}] {} #{} (score {:.3})",
                i + 1,
                hit.source,
                hit.chunk.sequence,
                hit.score
            );
            println!("{}", hit.chunk.text.trim());
            println!();
        }

        Ok(())
    }
}
