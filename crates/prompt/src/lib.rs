//! Prompt system for DocQA.
//!
//! This crate turns a question plus retrieved context into LLM messages:
//! - YAML-based prompt definitions with a built-in default
//! - Handlebars rendering of system and user templates
//! - Conversation history and low-confidence instructions

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_prompt, list_prompts, load_prompt, resolve_prompt, DEFAULT_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, HistoryEntry, PromptBehavior, PromptDefinition,
    PromptInput, PromptOutputSpec,
};
