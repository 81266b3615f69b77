//! Prompt types for regwise.

use regwise_llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// A system prompt definition loaded from YAML.
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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template string with Handlebars syntax. `{{default_prompt}}` expands
    /// to the built-in system prompt.
    pub template: String,
}

/// Messages ready to send, with the estimated prompt size.
#[derive(Debug, Clone)]
pub struct BuiltMessages {
    pub messages: Vec<ChatMessage>,

    /// Rough token estimate of `messages`
    pub estimated_tokens: u32,

    /// Budget the estimate was checked against
    pub max_tokens: u32,
}

impl BuiltMessages {
    /// Whether the estimate exceeds the budget.
    pub fn over_budget(&self) -> bool {
        self.estimated_tokens > self.max_tokens
    }
}
