//! Prompt loader for YAML prompt definitions.

use crate::types::PromptDefinition;
use docqa_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the built-in question-answering prompt.
pub const DEFAULT_PROMPT_ID: &str = "docqa.ask.default";

const DEFAULT_PROMPT_YAML: &str = r#"
id: docqa.ask.default
title: "Document question answering"
apiVersion: "1.0"
createdBy: docqa
behavior:
  tone: professional
  style: concise
system: |
  You are a helpful assistant that answers questions about the user's documents.
  Keep a {{tone}} tone and a {{style}} style.

  Instructions:
  - Answer questions using only the provided document excerpts.
  - If the excerpts do not contain the answer, say that clearly and do not make up information.
  - Mention which source an answer came from when it helps the reader.
  - Quote the documents directly when precision matters.
  {{#if low_confidence}}

  Note: the retrieved excerpts may not directly answer this question. Be cautious and state what the documents do and do not say.
  {{/if}}
template: |
  {{#if history}}
  Previous conversation:
  {{#each history}}
  User: {{this.query}}
  Assistant: {{this.answer}}
  {{/each}}

  {{/if}}
  Relevant information from the documents:
  {{#if context}}{{context}}{{else}}(no relevant excerpts were found){{/if}}

  Question: {{question}}
output:
  format: text
"#;

/// The built-in prompt used when no workspace override exists.
pub fn default_prompt() -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(DEFAULT_PROMPT_YAML)
        .map_err(|e| AppError::Prompt(format!("Failed to parse built-in prompt: {}", e)))?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Load a prompt definition by ID from the workspace.
///
/// Searches for `<id>.yml` in the `.docqa/prompts/` directory.
///
/// # Example
/// ```no_run
/// use docqa_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "docqa.ask.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(".docqa/prompts")
        .join(format!("{}.yml", prompt_id))
}

/// Load a workspace prompt, falling back to the built-in one for the default ID.
///
/// The fallback applies only when no override file exists; a broken
/// override is an error.
pub fn resolve_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    if prompt_id == DEFAULT_PROMPT_ID && !prompt_path(workspace_path, prompt_id).exists() {
        tracing::debug!("Using built-in prompt {}", DEFAULT_PROMPT_ID);
        return default_prompt();
    }

    load_prompt(workspace_path, prompt_id)
}

/// List all prompt IDs available in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let prompts_dir = workspace_path.join(".docqa/prompts");

    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
