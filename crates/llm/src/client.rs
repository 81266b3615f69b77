//! Chat completion abstraction and request/response types.
//!
//! Messages follow the OpenAI chat schema: a role plus either plain text or a
//! list of typed content parts, so a single user turn can mix the question,
//! retrieved passages and page images.

use futures::Stream;
use regwise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Image reference inside a content part. `url` is usually a data URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,

    /// "low", "high" or "auto"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One typed piece of a multimodal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

impl ContentPart {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from a URL or data URL.
    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl {
            image_url: ImageUrl {
                url: url.into(),
                detail: None,
            },
        }
    }
}

/// Message body: plain text or a list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The text, if this content is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(_) => None,
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: MessageContent,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a plain-text user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a multimodal user message.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: ChatRole::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Chat completion request, serialized as the wire body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model name, or deployment name on Azure
    pub model: String,

    pub messages: Vec<ChatMessage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Number of choices to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new chat request with required fields.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            n: None,
            stream: false,
        }
    }

    /// Enable streaming for this request.
    pub fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the number of choices.
    pub fn with_choices(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }
}

/// Message returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: ChatRole,

    #[serde(default)]
    pub content: Option<String>,
}

/// One generated choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,

    pub message: ResponseMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

/// Chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    pub choices: Vec<ChatChoice>,

    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    /// The first choice's message.
    pub fn first_message(&self) -> AppResult<&ResponseMessage> {
        self.choices
            .first()
            .map(|choice| &choice.message)
            .ok_or_else(|| AppError::Llm("Chat completion returned no choices".to_string()))
    }
}

/// A chunk from a streaming chat response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStreamChunk {
    /// Incremental text content
    pub content: String,

    /// Role, sent with the first delta only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,

    /// Set on the terminal `[DONE]` marker
    #[serde(default)]
    pub done: bool,
}

/// Stream of chat chunks.
pub type ChatStream = Pin<Box<dyn Stream<Item = AppResult<ChatStreamChunk>> + Send>>;

/// Trait for chat completion providers.
#[async_trait::async_trait]
pub trait ChatClient: Send + Sync {
    /// Get the provider name (e.g., "azure", "openai").
    fn provider_name(&self) -> &str;

    /// Perform a non-streaming completion.
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;

    /// Perform a streaming completion.
    async fn stream(&self, request: &ChatRequest) -> AppResult<ChatStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_multimodal_message_wire_shape() {
        let message = ChatMessage::user_parts(vec![
            ContentPart::text("What is a PayFac?"),
            ContentPart::image("data:image/png;base64,AAAA"),
        ]);

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is a PayFac?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                ]
            })
        );
    }

    #[test]
    fn test_message_content_deserializes_both_forms() {
        let plain: ChatMessage =
            serde_json::from_value(json!({"role": "user", "content": "hi"})).unwrap();
        assert_eq!(plain.content.as_text(), Some("hi"));

        let parts: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(parts.content.as_text(), None);
    }

    #[test]
    fn test_request_omits_unset_fields() {
        let request = ChatRequest::new("gpt-4o", vec![ChatMessage::user("hello")])
            .with_temperature(0.3)
            .with_max_tokens(1024)
            .with_choices(1);

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["n"], 1);
        assert!(body.get("stream").is_none());

        let streaming = serde_json::to_value(request.with_streaming()).unwrap();
        assert_eq!(streaming["stream"], true);
    }

    #[test]
    fn test_first_message_without_choices() {
        let response = ChatResponse {
            id: "x".to_string(),
            model: "gpt-4o".to_string(),
            choices: vec![],
            usage: None,
        };
        assert!(response.first_message().is_err());
    }

    #[test]
    fn test_display_renders_json() {
        let rendered = ChatMessage::system("Be brief").to_string();
        assert_eq!(rendered, r#"{"role":"system","content":"Be brief"}"#);
    }
}
