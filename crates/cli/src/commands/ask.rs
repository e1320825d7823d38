//! Ask command handler.
//!
//! Answers one question from a knowledge base.

use super::{llm_client, print_answer};
use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::KnowledgeBase;

/// Answer a question from a knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Knowledge base name
    pub base: String,

    /// The question to ask
    pub question: String,

    /// Number of passages to retrieve (overrides the base's top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command for base '{}'", self.base);

        let base = KnowledgeBase::open(&config.workspace, &self.base).await?;
        let llm = llm_client(config)?;

        let mut engine = base.answer_engine(llm, &config.model)?;
        if let Some(k) = self.top_k {
            engine = engine.with_top_k(k);
        }

        let answer = engine.ask(&self.question, &[]).await?;

        tracing::debug!(
            "Answer: grounded={}, confidence={:.2}, sources={}",
            answer.grounded,
            answer.confidence,
            answer.sources.len()
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            print_answer(&answer);
        }

        Ok(())
    }
}
