//! Azure AI Search REST client.

use crate::search::query::SearchRequest;
use crate::types::{Document, DocumentFields};
use regwise_core::config::SearchConfig;
use regwise_core::{AppError, AppResult};
use serde_json::Value;

/// A searchable document index.
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    /// Run a query and return every hit across all result pages.
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<Document>>;
}

/// Client for one index of an Azure AI Search service.
pub struct AzureSearchClient {
    /// `{endpoint}/indexes/{index}/docs/search?api-version=...`
    search_url: String,
    api_key: String,
    fields: DocumentFields,
    client: reqwest::Client,
}

impl AzureSearchClient {
    pub fn new(
        endpoint: &str,
        index: &str,
        api_version: &str,
        api_key: impl Into<String>,
        fields: DocumentFields,
    ) -> Self {
        Self {
            search_url: format!(
                "{}/indexes/{}/docs/search?api-version={}",
                endpoint.trim_end_matches('/'),
                index,
                api_version
            ),
            api_key: api_key.into(),
            fields,
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from the `search` config section.
    pub fn from_config(config: &SearchConfig, api_key: impl Into<String>) -> Self {
        Self::new(
            &config.endpoint,
            &config.index,
            &config.api_version,
            api_key,
            DocumentFields {
                content: config.content_field.clone(),
                sourcepage: config.sourcepage_field.clone(),
            },
        )
    }

    async fn fetch_page(&self, body: &Value) -> AppResult<Value> {
        let response = self
            .client
            .post(&self.search_url)
            .header("api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to send search request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Search(format!(
                "Search API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse search response: {}", e)))
    }
}

#[async_trait::async_trait]
impl SearchIndex for AzureSearchClient {
    async fn search(&self, request: &SearchRequest) -> AppResult<Vec<Document>> {
        tracing::info!(
            "Searching index (top={}, vectors={}, semantic={})",
            request.top,
            request.vector_queries.len(),
            request.query_type.is_some()
        );
        tracing::debug!("Search filter: {:?}", request.filter);

        let mut body = serde_json::to_value(request)?;
        let mut documents = Vec::new();
        let mut pages = 0u32;

        loop {
            let mut page = self.fetch_page(&body).await?;
            pages += 1;

            if let Some(hits) = page.get("value").and_then(Value::as_array) {
                documents.extend(hits.iter().map(|hit| Document::from_hit(hit, &self.fields)));
            }

            // The service hands back the body for the next page when it truncates
            match page.get_mut("@search.nextPageParameters").map(Value::take) {
                Some(next) if next.is_object() => body = next,
                _ => break,
            }
        }

        tracing::info!("Search returned {} documents in {} page(s)", documents.len(), pages);
        Ok(documents)
    }
}
