//! Prompt system for regwise.
//!
//! This crate provides:
//! - The built-in compliance assistant prompt
//! - YAML-based prompt definitions in `.regwise/prompts/`
//! - Handlebars template rendering
//! - Message building with a token budget check

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{
    apply_prompt_override, build_messages, estimate_tokens, render_system_template,
    render_template, resolve_system_prompt, DEFAULT_PROMPT_PLACEHOLDER,
};
pub use defaults::{DEFAULT_PROMPT_ID, EXAMPLE_QUESTIONS, SYSTEM_PROMPT};
pub use loader::{find_prompt, list_prompts, load_prompt};
pub use types::{BuiltMessages, PromptDefinition};
