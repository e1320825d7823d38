//! Prompt builder for rendering templates with retrieval context.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptInput};
use docqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde_json::json;

/// Build a prompt from a definition and its input.
///
/// Both the system and user templates see the same variables:
/// `question`, `context`, `history` (list of `{query, answer}`),
/// `low_confidence`, `tone` and `style`.
///
/// # Example
/// ```no_run
/// use docqa_prompt::{build_prompt, default_prompt, PromptInput};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = default_prompt()?;
/// let input = PromptInput::new("What is the warranty?")
///     .with_context("[Source 1: manual.pdf]\nTwo years.\n");
///
/// let built = build_prompt(&def, &input)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(definition: &PromptDefinition, input: &PromptInput) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let context = input
        .context
        .as_deref()
        .filter(|c| !c.trim().is_empty());

    let variables = json!({
        "question": input.question,
        "context": context,
        "history": input.history,
        "low_confidence": input.low_confidence,
        "tone": definition.behavior.tone,
        "style": definition.behavior.style,
    });

    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    let user = render(&mut handlebars, "user", &definition.template, &variables)?;
    let system = match &definition.system {
        Some(template) => Some(render(&mut handlebars, "system", template, &variables)?),
        None => None,
    };

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            context_included: context.is_some(),
            history_turns: input.history.len(),
            low_confidence: input.low_confidence,
        },
    })
}

fn render(
    handlebars: &mut Handlebars<'_>,
    name: &str,
    template: &str,
    variables: &serde_json::Value,
) -> AppResult<String> {
    handlebars
        .register_template_string(name, template)
        .map_err(|e| AppError::Prompt(format!("Failed to register {} template: {}", name, e)))?;

    let rendered = handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render {} template: {}", name, e)))?;

    Ok(rendered.trim().to_string())
}
