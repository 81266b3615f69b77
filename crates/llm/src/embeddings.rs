//! Query vectorization.
//!
//! Both the text embedding endpoint and the vision `vectorizeText` endpoint
//! turn a query string into a vector, so they share one trait.

use regwise_core::AppResult;

/// Trait for services that embed a query string.
#[async_trait::async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Get provider name (e.g., "openai", "vision")
    fn provider_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;
}
