//! Ingest command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::{KnowledgeBase, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Load, chunk and index documents into a knowledge base
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to ingest (PDF, Markdown, plain text)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Discard the existing index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for base '{}'", self.base);

        let base = if self.reset {
            KnowledgeBase::fresh(&config.workspace, &self.base).await?
        } else {
            KnowledgeBase::open(&config.workspace, &self.base).await?
        };

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event| eprintln!("{}", event.format_simple())))
        };

        let report = base.ingest(&self.paths, progress).await?;

        if self.json {
            let output = serde_json::json!({
                "base": self.base,
                "indexed": report.indexed,
                "skipped": report.skipped,
                "failures": report.failures,
                "chunksAdded": report.chunks_added(),
                "durationSecs": report.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} documents ({} chunks) in {:.2}s",
                report.indexed.len(),
                report.chunks_added(),
                report.duration_secs
            );
            if !report.skipped.is_empty() {
                println!("Skipped {} unchanged documents", report.skipped.len());
            }
            for failure in &report.failures {
                eprintln!("Failed: {} ({})", failure.document, failure.error);
            }
        }

        Ok(())
    }
}
