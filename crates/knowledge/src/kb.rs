//! Named knowledge bases on disk.
//!
//! A base lives in `.docqa/bases/<name>/` and holds `config.yaml`, the index
//! snapshot `index.json` and `stats.json`. [`KnowledgeBase`] wires the
//! loader, ingestion coordinator, retriever and answer engine around one
//! shared index.

use crate::chunker::Chunker;
use crate::config;
use crate::embeddings::Embedder;
use crate::flat_index::FlatIndex;
use crate::ingest::Ingestor;
use crate::loader;
use crate::persistence;
use crate::progress::ProgressReporter;
use crate::rag::{Answer, AnswerEngine, AnswerSettings};
use crate::retriever::Retriever;
use crate::shared_index::SharedIndex;
use crate::types::{BaseStats, IngestReport, KnowledgeBaseConfig, RetrievalResult};
use crate::vector_index::VectorIndex;
use chrono::{DateTime, Utc};
use docqa_core::{AppError, AppResult};
use docqa_llm::LlmClient;
use docqa_prompt::{resolve_prompt, HistoryEntry, DEFAULT_PROMPT_ID};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    workspace: PathBuf,
    config: KnowledgeBaseConfig,
    embedder: Arc<Embedder>,
    index: SharedIndex,
}

impl KnowledgeBase {
    /// Open a base, loading its persisted index if there is one.
    ///
    /// Fails if the stored index was built with a different embedding
    /// provider, model or dimension than the base is now configured for.
    pub async fn open(workspace: &Path, name: &str) -> AppResult<Self> {
        let config = config::load_config(workspace, name)?;
        let embedder = Embedder::from_config(&config.embedding).await?;
        Self::with_embedder(workspace, config, embedder).await
    }

    /// Open a base with an empty index, ignoring whatever is stored.
    ///
    /// The stored index is replaced on the next save.
    pub async fn fresh(workspace: &Path, name: &str) -> AppResult<Self> {
        let config = config::load_config(workspace, name)?;
        let embedder = Embedder::from_config(&config.embedding).await?;
        Ok(Self::assemble(workspace, config, embedder, FlatIndex::new()))
    }

    /// Open a base around an already-built embedder.
    pub async fn with_embedder(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        embedder: Embedder,
    ) -> AppResult<Self> {
        config.validate()?;

        let stats_path = config::get_stats_path(workspace, &config.name);
        if let Some(stats) = persistence::load_stats(&stats_path).await? {
            if let Some(built_with) = &stats.embedding {
                config.embedding.validate_consistency(built_with)?;
            }
        }

        let index_path = config::get_index_path(workspace, &config.name);
        let index = match persistence::load_index(&index_path).await? {
            Some(index) => {
                if let Some(dimension) = index.dimension() {
                    if dimension != embedder.dimension() {
                        return Err(AppError::DimensionMismatch {
                            expected: dimension,
                            actual: embedder.dimension(),
                        });
                    }
                }
                tracing::info!(
                    "Loaded knowledge base '{}' ({} documents, {} chunks)",
                    config.name,
                    index.document_count(),
                    index.len()
                );
                index
            }
            None => {
                tracing::debug!("Knowledge base '{}' has no index yet", config.name);
                FlatIndex::new()
            }
        };

        Ok(Self::assemble(workspace, config, embedder, index))
    }

    fn assemble(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        embedder: Embedder,
        index: FlatIndex,
    ) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            config,
            embedder: Arc::new(embedder),
            index: SharedIndex::new(index),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.embedder.clone(), self.index.clone())
            .with_min_score(self.config.min_score)
    }

    pub fn ingestor(&self) -> AppResult<Ingestor> {
        let chunker = Chunker::new(self.config.chunk_size, self.config.chunk_overlap)?;
        Ok(Ingestor::new(
            chunker,
            self.embedder.clone(),
            self.index.clone(),
            &self.config.ingest,
        ))
    }

    /// Load, chunk, embed and index every supported file under `paths`,
    /// then persist the index.
    pub async fn ingest(
        &self,
        paths: &[PathBuf],
        progress: ProgressReporter,
    ) -> AppResult<IngestReport> {
        tracing::info!(
            "Ingesting {} path(s) into knowledge base '{}'",
            paths.len(),
            self.name()
        );

        let ingestor = self.ingestor()?.with_progress(progress.clone());
        let (documents, mut failures) = loader::load_documents(paths, &progress).await;

        let mut report = ingestor.ingest(documents).await;
        failures.append(&mut report.failures);
        report.failures = failures;

        config::save_config(&self.workspace, &self.config)?;
        self.persist(Some(Utc::now())).await?;

        Ok(report)
    }

    /// Ranked passages for `query`.
    pub async fn search(&self, query: &str, k: usize) -> AppResult<RetrievalResult> {
        self.retriever().search(query, k).await
    }

    /// Answer engine using the workspace's prompt (or the built-in one).
    ///
    /// `default_model` is used unless the base configures its own.
    pub fn answer_engine(
        &self,
        llm: Arc<dyn LlmClient>,
        default_model: &str,
    ) -> AppResult<AnswerEngine> {
        let prompt = resolve_prompt(&self.workspace, DEFAULT_PROMPT_ID)?;
        let settings = AnswerSettings {
            top_k: self.config.top_k,
            max_context_chars: self.config.max_context_chars,
            max_history_turns: self.config.max_history_turns,
            model: self
                .config
                .generation
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            generation: self.config.generation.clone(),
        };

        Ok(AnswerEngine::new(self.retriever(), llm, prompt, settings))
    }

    /// One-shot question answering.
    pub async fn ask(
        &self,
        llm: Arc<dyn LlmClient>,
        default_model: &str,
        question: &str,
        history: &[HistoryEntry],
    ) -> AppResult<Answer> {
        self.answer_engine(llm, default_model)?
            .ask(question, history)
            .await
    }

    /// Write the index snapshot and refresh `stats.json`.
    pub async fn save(&self) -> AppResult<()> {
        let stats_path = config::get_stats_path(&self.workspace, self.name());
        let last_ingest_at = persistence::load_stats(&stats_path)
            .await?
            .and_then(|s| s.last_ingest_at);
        self.persist(last_ingest_at).await
    }

    async fn persist(&self, last_ingest_at: Option<DateTime<Utc>>) -> AppResult<()> {
        let snapshot = self.index.snapshot().await?;
        let index_path = config::get_index_path(&self.workspace, self.name());
        persistence::save_index(&index_path, &snapshot).await?;

        let stats = BaseStats {
            base_name: self.name().to_string(),
            documents_count: self.index.document_count().await,
            chunks_count: self.index.len().await,
            dimension: self.index.dimension().await,
            index_size_bytes: snapshot.len() as u64,
            embedding: Some(self.config.embedding.clone()),
            last_ingest_at,
        };
        let stats_path = config::get_stats_path(&self.workspace, self.name());
        persistence::save_stats(&stats_path, &stats).await?;

        tracing::info!(
            "Saved knowledge base '{}' ({} documents, {} chunks, {} bytes)",
            stats.base_name,
            stats.documents_count,
            stats.chunks_count,
            stats.index_size_bytes
        );
        Ok(())
    }

    /// Statistics for a base, read from `stats.json` without loading the index.
    pub async fn stats(workspace: &Path, name: &str) -> AppResult<BaseStats> {
        let config = config::load_config(workspace, name)?;
        ensure_exists(workspace, name)?;

        let stats_path = config::get_stats_path(workspace, name);
        let stats = persistence::load_stats(&stats_path).await?;

        Ok(stats.unwrap_or_else(|| BaseStats {
            base_name: name.to_string(),
            documents_count: 0,
            chunks_count: 0,
            dimension: None,
            index_size_bytes: 0,
            embedding: Some(config.embedding),
            last_ingest_at: None,
        }))
    }

    /// Delete a base's index and statistics, keeping its configuration.
    pub async fn clean(workspace: &Path, name: &str) -> AppResult<()> {
        config::load_config(workspace, name)?;
        ensure_exists(workspace, name)?;

        tracing::info!("Cleaning knowledge base '{}'", name);
        persistence::remove_if_exists(&config::get_index_path(workspace, name)).await?;
        persistence::remove_if_exists(&config::get_stats_path(workspace, name)).await?;

        tracing::info!("Knowledge base '{}' cleaned", name);
        Ok(())
    }
}

fn ensure_exists(workspace: &Path, name: &str) -> AppResult<()> {
    if config::get_base_dir(workspace, name).is_dir() {
        Ok(())
    } else {
        Err(AppError::Knowledge(format!(
            "Knowledge base '{}' does not exist. Run 'docqa ingest {} <paths>' first.",
            name, name
        )))
    }
}
