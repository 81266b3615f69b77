//! Model service integration for regwise.
//!
//! Chat completions, text embeddings and vision vectorization behind
//! provider-agnostic traits, so the retrieval approach never sees HTTP.
//!
//! # Providers
//! - **Azure OpenAI**: deployment-addressed endpoints with `api-key` auth (default)
//! - **OpenAI**: `/v1` endpoints with bearer auth, also used for compatible servers
//! - **Azure AI Vision**: `vectorizeText` for image-space query vectors
//!
//! # Example
//! ```no_run
//! use regwise_llm::{ChatClient, ChatMessage, ChatRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::azure("https://example.openai.azure.com", "key", "2024-02-01");
//! let request = ChatRequest::new("gpt-4o", vec![ChatMessage::user("Hello")]);
//! let response = client.complete(&request).await?;
//! println!("{:?}", response.first_message()?.content);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod embeddings;
pub mod factory;
pub mod models;
pub mod providers;

// Re-export main types
pub use auth::{EnvTokenProvider, TokenProvider};
pub use client::{
    ChatChoice, ChatClient, ChatMessage, ChatRequest, ChatResponse, ChatRole, ChatStream,
    ChatStreamChunk, ChatUsage, ContentPart, ImageUrl, MessageContent, ResponseMessage,
};
pub use embeddings::EmbeddingClient;
pub use factory::{create_chat_client, create_text_embedder, create_vision_vectorizer, ProviderType};
pub use models::{get_token_limit, supports_dimensions};
