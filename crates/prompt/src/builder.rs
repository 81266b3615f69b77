//! System prompt resolution and message building.

use crate::defaults::SYSTEM_PROMPT;
use crate::loader::find_prompt;
use crate::types::BuiltMessages;
use handlebars::Handlebars;
use regwise_core::{AppError, AppResult};
use regwise_llm::{ChatMessage, ContentPart, MessageContent};
use std::collections::HashMap;
use std::path::Path;

/// Tokens added per message for role and framing.
const MESSAGE_OVERHEAD_TOKENS: u32 = 4;

/// Tokens that prime every reply.
const REPLY_PRIMING_TOKENS: u32 = 3;

/// Flat estimate for one image part (a 1024x1024 high-detail tile set).
const IMAGE_TOKENS: u32 = 765;

const CHARS_PER_TOKEN: usize = 4;

/// Render a Handlebars template with variables.
pub fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

/// Placeholder a per-request template uses to extend the active prompt.
pub const DEFAULT_PROMPT_PLACEHOLDER: &str = "{{default_prompt}}";

/// Render a workspace prompt template, exposing the built-in prompt as
/// `{{default_prompt}}`.
pub fn render_system_template(template: &str) -> AppResult<String> {
    let mut variables = HashMap::new();
    variables.insert("default_prompt".to_string(), SYSTEM_PROMPT.to_string());
    render_template(template, &variables)
}

/// Apply a per-request prompt template on top of the active prompt.
///
/// The template is sent as written. Only the literal `{{default_prompt}}`
/// is replaced, so other braces reach the model untouched.
pub fn apply_prompt_override(template: &str, active_prompt: &str) -> String {
    template.replace(DEFAULT_PROMPT_PLACEHOLDER, active_prompt)
}

/// Pick the system prompt for a request.
///
/// The active prompt is the workspace definition named `prompt_id`, or the
/// built-in prompt when there is none. A per-request template replaces it,
/// with `{{default_prompt}}` expanding to the active prompt.
pub fn resolve_system_prompt(
    workspace_path: &Path,
    prompt_id: &str,
    override_template: Option<&str>,
) -> AppResult<String> {
    let active = match find_prompt(workspace_path, prompt_id)? {
        Some(definition) => render_system_template(&definition.template)?,
        None => SYSTEM_PROMPT.to_string(),
    };

    match override_template {
        Some(template) => {
            tracing::debug!("Using per-request prompt template");
            Ok(apply_prompt_override(template, &active))
        }
        None => Ok(active),
    }
}

fn estimate_text_tokens(text: &str) -> u32 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u32
}

/// Rough token count for a list of chat messages.
pub fn estimate_tokens(messages: &[ChatMessage]) -> u32 {
    let content_tokens: u32 = messages
        .iter()
        .map(|message| {
            let body = match &message.content {
                MessageContent::Text(text) => estimate_text_tokens(text),
                MessageContent::Parts(parts) => parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => estimate_text_tokens(text),
                        ContentPart::ImageUrl { .. } => IMAGE_TOKENS,
                    })
                    .sum(),
            };
            MESSAGE_OVERHEAD_TOKENS + body
        })
        .sum();

    content_tokens + REPLY_PRIMING_TOKENS
}

/// Build the `[system, user]` message pair for a request.
///
/// The user content is always kept whole. When the estimate exceeds
/// `max_tokens` a warning is logged and the messages are returned as-is.
pub fn build_messages(
    model: &str,
    system_prompt: &str,
    user_content: Vec<ContentPart>,
    max_tokens: u32,
) -> BuiltMessages {
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_parts(user_content),
    ];

    let estimated_tokens = estimate_tokens(&messages);
    tracing::debug!(
        "Built {} messages for {}: ~{} tokens of {} allowed",
        messages.len(),
        model,
        estimated_tokens,
        max_tokens
    );

    let built = BuiltMessages {
        messages,
        estimated_tokens,
        max_tokens,
    };

    if built.over_budget() {
        tracing::warn!(
            "Prompt for {} is ~{} tokens, over the {} token budget",
            model,
            estimated_tokens,
            max_tokens
        );
    }

    built
}
