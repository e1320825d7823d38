//! Prompt types for DocQA.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Behavioral settings
    pub behavior: PromptBehavior,

    /// System message template (Handlebars)
    #[serde(default)]
    pub system: Option<String>,

    /// User message template (Handlebars)
    pub template: String,

    /// Output format settings
    pub output: PromptOutputSpec,
}

/// Behavioral settings for prompt execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBehavior {
    /// Tone (e.g., "professional", "casual", "technical")
    pub tone: String,

    /// Style (e.g., "concise", "detailed", "conversational")
    pub style: String,
}

/// Output format settings for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "markdown")
    pub format: String,
}

/// One prior exchange replayed into the prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub query: String,
    pub answer: String,
}

/// Values substituted into a prompt definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInput {
    /// The user's question
    pub question: String,

    /// Rendered retrieval context; `None` when nothing was retrieved
    pub context: Option<String>,

    /// Prior exchanges, oldest first
    #[serde(default)]
    pub history: Vec<HistoryEntry>,

    /// Whether retrieval scores were weak
    #[serde(default)]
    pub low_confidence: bool,
}

impl PromptInput {
    /// Create input for a bare question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Attach retrieval context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach conversation history.
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Flag weak retrieval.
    pub fn with_low_confidence(mut self, low_confidence: bool) -> Self {
        self.low_confidence = low_confidence;
        self
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Whether retrieval context was included
    #[serde(rename = "contextIncluded")]
    pub context_included: bool,

    /// Number of history turns replayed
    #[serde(rename = "historyTurns")]
    pub history_turns: usize,

    /// Whether the low-confidence instruction was active
    #[serde(rename = "lowConfidence")]
    pub low_confidence: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
behavior:
  tone: professional
  style: concise
system: "You answer questions."
template: "{{question}}"
output:
  format: markdown
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.behavior.tone, "professional");
        assert_eq!(def.system.as_deref(), Some("You answer questions."));
        assert_eq!(def.output.format, "markdown");
    }

    #[test]
    fn test_prompt_input_builder() {
        let input = PromptInput::new("What is the warranty?")
            .with_context("[Source 1: manual.pdf]\nTwo years.")
            .with_history(vec![HistoryEntry {
                query: "Hi".to_string(),
                answer: "Hello".to_string(),
            }])
            .with_low_confidence(true);

        assert_eq!(input.question, "What is the warranty?");
        assert!(input.context.is_some());
        assert_eq!(input.history.len(), 1);
        assert!(input.low_confidence);
    }
}
