//! Clean command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::KnowledgeBase;

/// Delete a knowledge base's index
#[derive(Args, Debug)]
pub struct CleanCommand {
    /// Knowledge base name
    pub base: String,
}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command for base '{}'", self.base);

        KnowledgeBase::clean(&config.workspace, &self.base).await?;

        println!("Knowledge base '{}' cleaned", self.base);

        Ok(())
    }
}
