//! Client factory.
//!
//! Builds chat, embedding and vision clients from application configuration.
//! Secrets are passed in by the caller, which resolves them from the
//! environment.

use crate::auth::EnvTokenProvider;
use crate::client::ChatClient;
use crate::embeddings::EmbeddingClient;
use crate::providers::{OpenAiClient, OpenAiEmbedder, VisionVectorizer};
use regwise_core::config::{OpenAiConfig, VisionConfig};
use regwise_core::{AppError, AppResult};
use std::str::FromStr;
use std::sync::Arc;

/// Supported OpenAI-compatible hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Azure,
    OpenAi,
}

impl FromStr for ProviderType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azure" | "azure-openai" => Ok(Self::Azure),
            "openai" => Ok(Self::OpenAi),
            _ => Err(AppError::Config(format!("Unknown provider: {}", s))),
        }
    }
}

fn base_client(config: &OpenAiConfig, api_key: &str) -> AppResult<OpenAiClient> {
    if config.endpoint.trim().is_empty() {
        return Err(AppError::Config(
            "Missing required setting: openai.endpoint".to_string(),
        ));
    }

    let client = match config.provider.parse::<ProviderType>()? {
        ProviderType::Azure => {
            OpenAiClient::azure(&config.endpoint, api_key, &config.api_version)
        }
        ProviderType::OpenAi => OpenAiClient::openai(&config.endpoint, api_key),
    };
    Ok(client)
}

/// Create the chat client for the configured provider.
pub fn create_chat_client(config: &OpenAiConfig, api_key: &str) -> AppResult<Arc<dyn ChatClient>> {
    let client = base_client(config, api_key)?;
    tracing::debug!("Created {} chat client for {}", client.provider_name(), config.endpoint);
    Ok(Arc::new(client))
}

/// Create the text embedding client.
pub fn create_text_embedder(
    config: &OpenAiConfig,
    api_key: &str,
) -> AppResult<Arc<dyn EmbeddingClient>> {
    let client = base_client(config, api_key)?;
    Ok(Arc::new(OpenAiEmbedder::new(
        client,
        &config.embedding_model,
        config.embedding_deployment.clone(),
        config.embedding_dimensions,
    )))
}

/// Create the vision vectorizer. The bearer token is read from the
/// configured environment variable on each request.
pub fn create_vision_vectorizer(config: &VisionConfig) -> AppResult<Arc<dyn EmbeddingClient>> {
    let token_provider = Arc::new(EnvTokenProvider::new(&config.token_env));
    Ok(Arc::new(VisionVectorizer::new(&config.endpoint, token_provider)?))
}
