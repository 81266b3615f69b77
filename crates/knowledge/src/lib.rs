//! Retrieval and answering over a regulatory document index.
//!
//! Provides the search index and blob storage clients, source formatting
//! and the retrieve-then-read approach that ties them to a chat model.

pub mod overrides;
pub mod rag;
pub mod search;
pub mod sources;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use overrides::{ChatContext, Overrides, RetrievalMode, VisionInput};
pub use rag::{
    ApproachEvent, ApproachResponse, ApproachSettings, ApproachStream, RetrieveThenReadVision,
};
pub use search::{AzureSearchClient, SearchIndex};
pub use storage::{AzureBlobContainer, BlobStore};
pub use types::{AuthClaims, Document, QueryCaption};

use regwise_core::{AppConfig, AppResult};
use regwise_llm::{create_chat_client, create_text_embedder, create_vision_vectorizer};
use std::sync::Arc;

/// Build the approach with live service clients from configuration.
///
/// Secrets are read from the environment variables the config names.
pub fn build_approach(config: &AppConfig) -> AppResult<RetrieveThenReadVision> {
    tracing::debug!(
        "Building approach: index={}, container={}, model={}",
        config.search.index,
        config.storage.container,
        config.openai.chat_model
    );

    let search_key = AppConfig::resolve_secret(&config.search.api_key_env)?;
    let openai_key = AppConfig::resolve_secret(&config.openai.api_key_env)?;

    let search_index = Arc::new(AzureSearchClient::from_config(&config.search, search_key));
    let blob_store = Arc::new(AzureBlobContainer::from_config(&config.storage)?);
    let chat_client = create_chat_client(&config.openai, &openai_key)?;
    let text_embedder = create_text_embedder(&config.openai, &openai_key)?;
    let image_embedder = config
        .vision
        .as_ref()
        .map(create_vision_vectorizer)
        .transpose()?;

    if image_embedder.is_none() {
        tracing::debug!("No vision endpoint configured; image vector fields are unavailable");
    }

    RetrieveThenReadVision::new(
        search_index,
        blob_store,
        chat_client,
        text_embedder,
        image_embedder,
        ApproachSettings::from_config(config)?,
    )
}
