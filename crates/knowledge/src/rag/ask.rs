//! Answer generation over retrieved passages.
//!
//! Retrieves passages, renders the prompt with context and recent history,
//! and calls the LLM with a deadline and bounded retries. When retrieval
//! yields nothing usable the engine answers "insufficient information"
//! without calling the model.

use crate::rag::types::{confidence, Answer, SourceRef, CONFIDENCE_THRESHOLD};
use crate::retriever::Retriever;
use crate::types::GenerationConfig;
use docqa_core::{retry_with_backoff, with_timeout, AppError, AppResult};
use docqa_llm::{LlmClient, LlmRequest, LlmResponse};
use docqa_prompt::{build_prompt, HistoryEntry, PromptDefinition, PromptInput};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Knobs for one answer engine.
#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub max_history_turns: usize,

    /// Model passed to the LLM client
    pub model: String,

    pub generation: GenerationConfig,
}

/// Retrieval plus generation.
pub struct AnswerEngine {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    settings: AnswerSettings,
}

impl std::fmt::Debug for AnswerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerEngine")
            .field("llm", &self.llm.provider_name())
            .field("prompt", &self.prompt.id)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AnswerEngine {
    pub fn new(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            retriever,
            llm,
            prompt,
            settings,
        }
    }

    /// Retrieve `top_k` passages per question instead of the configured count.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.settings.top_k = top_k;
        self
    }

    pub fn settings(&self) -> &AnswerSettings {
        &self.settings
    }

    /// Answer `question`, replaying the last `max_history_turns` of `history`.
    pub async fn ask(&self, question: &str, history: &[HistoryEntry]) -> AppResult<Answer> {
        let start = Instant::now();
        tracing::info!("Answering question: {}", question);

        let retrieval = match self
            .retriever
            .retrieve(question, self.settings.top_k, self.settings.max_context_chars)
            .await
        {
            Ok(retrieval) => retrieval,
            Err(AppError::EmptyIndex(reason)) => {
                tracing::info!("Nothing to retrieve from ({}); declining to answer", reason);
                return Ok(self.insufficient(question, start));
            }
            Err(e) => return Err(e),
        };

        if retrieval.context.chunks_used == 0 {
            tracing::info!(
                "No relevant passages for the question ({} hits retrieved)",
                retrieval.result.len()
            );
            return Ok(self.insufficient(question, start));
        }

        let top_score = retrieval.result.top_score();
        let low_confidence = top_score < CONFIDENCE_THRESHOLD;
        let used_hits = &retrieval.result.hits[..retrieval.context.chunks_used];

        let skip = history
            .len()
            .saturating_sub(self.settings.max_history_turns);
        let input = PromptInput::new(question)
            .with_context(retrieval.context.text.as_str())
            .with_history(history[skip..].to_vec())
            .with_low_confidence(low_confidence);
        let built = build_prompt(&self.prompt, &input)?;

        tracing::debug!(
            "Prompt built from '{}' (history_turns={}, low_confidence={}, top_score={:.3})",
            built.metadata.source_prompt_id,
            built.metadata.history_turns,
            low_confidence,
            top_score
        );

        let generation = &self.settings.generation;
        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_temperature(generation.temperature)
            .with_max_tokens(generation.max_tokens);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.complete(&request).await?;
        let elapsed = start.elapsed().as_secs_f64();

        tracing::info!(
            "Answer generated by {} in {:.2}s ({} tokens)",
            response.model,
            elapsed,
            response.usage.total_tokens
        );

        Ok(Answer {
            answer: response.content,
            sources: SourceRef::from_hits(used_hits),
            retrieved_chunks: used_hits.len(),
            confidence: confidence(&retrieval.result.scores()),
            model: response.model,
            usage: response.usage,
            response_time_secs: elapsed,
            grounded: true,
        })
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let operation = format!("{} complete", self.llm.provider_name());
        let op = operation.as_str();
        let llm = &self.llm;
        let timeout = Duration::from_secs(self.settings.generation.timeout_secs);

        retry_with_backoff(&self.settings.generation.retry, op, || async move {
            with_timeout(op, timeout, llm.complete(request)).await
        })
        .await
    }

    fn insufficient(&self, question: &str, start: Instant) -> Answer {
        let mut answer = Answer::insufficient_information(question);
        answer.response_time_secs = start.elapsed().as_secs_f64();
        answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::embeddings::{Embedder, EmbeddingConfig};
    use crate::flat_index::FlatIndex;
    use crate::shared_index::SharedIndex;
    use crate::types::{Chunk, EmbeddedChunk};
    use docqa_core::RetryPolicy;
    use docqa_llm::LlmUsage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records requests and replies with a fixed answer after N failures.
    #[derive(Default)]
    struct ScriptedLlm {
        requests: Mutex<Vec<LlmRequest>>,
        failures_left: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmClient for ScriptedLlm {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(AppError::Llm("connection reset".to_string()));
            }
            Ok(LlmResponse {
                content: "Two years.".to_string(),
                model: request.model.clone(),
                usage: LlmUsage::new(100, 5),
                stop_reason: None,
            })
        }
    }

    /// Never answers within any reasonable deadline.
    struct HangingLlm;

    #[async_trait::async_trait]
    impl LlmClient for HangingLlm {
        fn provider_name(&self) -> &str {
            "hanging"
        }

        async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(AppError::Other("unreachable".to_string()))
        }
    }

    const DIMS: usize = 384;

    async fn retriever(passages: &[(&str, &str)]) -> Retriever {
        let config = EmbeddingConfig {
            dimensions: DIMS,
            ..Default::default()
        };
        let embedder =
            Arc::new(Embedder::new(Arc::new(MockProvider::new(DIMS)), &config).unwrap());
        let index = SharedIndex::new(FlatIndex::new());

        for (i, (source, text)) in passages.iter().enumerate() {
            let vector = embedder.embed(text).await.unwrap();
            index
                .add_document(vec![EmbeddedChunk {
                    chunk: Chunk {
                        document_id: format!("doc-{i}"),
                        sequence: 0,
                        start: 0,
                        end: text.chars().count(),
                        text: text.to_string(),
                    },
                    source: source.to_string(),
                    content_hash: format!("hash-{i}"),
                    vector,
                }])
                .await
                .unwrap();
        }

        Retriever::new(embedder, index)
    }

    fn settings() -> AnswerSettings {
        AnswerSettings {
            top_k: 3,
            max_context_chars: 4000,
            max_history_turns: 2,
            model: "test-model".to_string(),
            generation: GenerationConfig {
                retry: RetryPolicy {
                    max_attempts: 3,
                    initial_backoff_ms: 1,
                    max_backoff_ms: 2,
                },
                ..Default::default()
            },
        }
    }

    fn engine(retriever: Retriever, llm: Arc<dyn LlmClient>) -> AnswerEngine {
        AnswerEngine::new(retriever, llm, docqa_prompt::default_prompt().unwrap(), settings())
    }

    #[tokio::test]
    async fn test_empty_index_declines_without_calling_llm() {
        let llm = Arc::new(ScriptedLlm::default());
        let engine = engine(retriever(&[]).await, llm.clone());

        let answer = engine.ask("How long is the warranty?", &[]).await.unwrap();

        assert!(!answer.grounded);
        assert!(answer.answer.contains("could not find"));
        assert!(llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_carries_context_sources_and_history() {
        let llm = Arc::new(ScriptedLlm::default());
        let retriever = retriever(&[
            ("warranty.pdf", "The warranty period lasts two years from purchase."),
            ("shipping.pdf", "Shipping takes five business days."),
        ])
        .await;
        let engine = engine(retriever, llm.clone());

        let history = vec![
            HistoryEntry {
                query: "oldest question".to_string(),
                answer: "oldest answer".to_string(),
            },
            HistoryEntry {
                query: "Do you sell laptops?".to_string(),
                answer: "Yes.".to_string(),
            },
            HistoryEntry {
                query: "Which brands?".to_string(),
                answer: "Several.".to_string(),
            },
        ];

        let answer = engine
            .ask("How long is the warranty period?", &history)
            .await
            .unwrap();

        assert!(answer.grounded);
        assert_eq!(answer.answer, "Two years.");
        assert_eq!(answer.model, "test-model");
        assert_eq!(answer.sources[0].source, "warranty.pdf");
        assert!(answer.retrieved_chunks >= 1);
        assert!(answer.confidence > 0.0);

        let requests = llm.requests.lock().unwrap();
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("[Source 1: warranty.pdf]"));
        assert!(prompt.contains("How long is the warranty period?"));
        assert!(prompt.contains("Which brands?"));
        assert!(!prompt.contains("oldest question"));
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn test_low_scores_add_cautionary_instruction() {
        let llm = Arc::new(ScriptedLlm::default());
        let retriever = retriever(&[("menu.pdf", "Pancakes with maple syrup and berries.")]).await;
        let engine = engine(retriever, llm.clone());

        let answer = engine
            .ask("quarterly revenue projections spreadsheet", &[])
            .await
            .unwrap();

        assert!(answer.confidence < CONFIDENCE_THRESHOLD);
        let requests = llm.requests.lock().unwrap();
        let system = requests[0].system.as_deref().unwrap_or_default();
        assert!(system.contains("may not directly answer"));
    }

    #[tokio::test]
    async fn test_transient_llm_errors_are_retried() {
        let llm = Arc::new(ScriptedLlm {
            failures_left: AtomicUsize::new(2),
            ..Default::default()
        });
        let retriever =
            retriever(&[("warranty.pdf", "The warranty period lasts two years.")]).await;
        let engine = engine(retriever, llm.clone());

        let answer = engine.ask("warranty period", &[]).await.unwrap();
        assert_eq!(answer.answer, "Two years.");
        assert_eq!(llm.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hanging_llm_times_out() {
        let retriever =
            retriever(&[("warranty.pdf", "The warranty period lasts two years.")]).await;
        let mut settings = settings();
        settings.generation.timeout_secs = 1;
        settings.generation.retry = RetryPolicy::none();
        let engine = AnswerEngine::new(
            retriever,
            Arc::new(HangingLlm),
            docqa_prompt::default_prompt().unwrap(),
            settings,
        );

        assert!(matches!(
            engine.ask("warranty period", &[]).await,
            Err(AppError::UpstreamTimeout { .. })
        ));
    }
}
