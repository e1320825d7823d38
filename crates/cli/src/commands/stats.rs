//! Stats command handler.

use clap::Args;
use docqa_core::{config::AppConfig, AppResult};
use docqa_knowledge::KnowledgeBase;

/// Show knowledge base statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for base '{}'", self.base);

        let stats = KnowledgeBase::stats(&config.workspace, &self.base).await?;

        if self.json {
            let output = serde_json::json!({
                "base": stats.base_name,
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "dimension": stats.dimension,
                "indexSizeBytes": stats.index_size_bytes,
                "embedding": stats.embedding,
                "lastIngestAt": stats.last_ingest_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Documents: {}", stats.documents_count);
            println!("  Chunks: {}", stats.chunks_count);
            if let Some(dimension) = stats.dimension {
                println!("  Dimension: {}", dimension);
            }
            println!("  Index size: {} bytes", stats.index_size_bytes);
            if let Some(embedding) = &stats.embedding {
                println!("  Embedding: {} ({})", embedding.model, embedding.provider);
            }
            if let Some(last_ingest) = stats.last_ingest_at {
                println!("  Last ingest: {}", last_ingest);
            }
        }

        Ok(())
    }
}
