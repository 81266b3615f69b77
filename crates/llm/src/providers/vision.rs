//! Azure AI Vision text vectorizer.
//!
//! Produces query vectors in the same space as the page-image embeddings
//! stored in the index.

use crate::auth::TokenProvider;
use crate::embeddings::EmbeddingClient;
use regwise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const VECTORIZE_TEXT_PATH: &str = "computervision/retrieval:vectorizeText";
const VECTORIZE_API_VERSION: &str = "2023-02-01-preview";

#[derive(Debug, Serialize)]
struct VectorizeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct VectorizeResponse {
    vector: Vec<f32>,
}

/// Client for the `retrieval:vectorizeText` endpoint.
pub struct VisionVectorizer {
    endpoint: url::Url,
    token_provider: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl VisionVectorizer {
    pub fn new(endpoint: &str, token_provider: Arc<dyn TokenProvider>) -> AppResult<Self> {
        // A trailing slash keeps `join` from replacing the last path segment
        let normalized = format!("{}/", endpoint.trim_end_matches('/'));
        let endpoint = url::Url::parse(&normalized)
            .map_err(|e| AppError::Config(format!("Invalid vision endpoint '{}': {}", endpoint, e)))?;

        Ok(Self {
            endpoint,
            token_provider,
            client: reqwest::Client::new(),
        })
    }

    fn vectorize_url(&self) -> AppResult<url::Url> {
        let mut url = self
            .endpoint
            .join(VECTORIZE_TEXT_PATH)
            .map_err(|e| AppError::Config(format!("Invalid vision endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api-version", VECTORIZE_API_VERSION)
            .append_pair("modelVersion", "latest");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for VisionVectorizer {
    fn provider_name(&self) -> &str {
        "vision"
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = self.vectorize_url()?;
        let token = self.token_provider.token().await?;

        tracing::debug!("Vectorizing query text with {}", self.endpoint);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&VectorizeRequest { text })
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send vectorize request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Vision API error ({}): {}",
                status, error_text
            )));
        }

        let body: VectorizeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse vectorize response: {}", e)))?;

        Ok(body.vector)
    }
}
