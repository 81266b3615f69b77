//! Blob storage for rendered page images.

use crate::sources::split_extension;
use crate::types::Document;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regwise_core::config::StorageConfig;
use regwise_core::{AppError, AppResult};

/// Read access to a blob container.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Download a blob. `Ok(None)` means the blob does not exist.
    async fn download(&self, blob_name: &str) -> AppResult<Option<Vec<u8>>>;
}

/// One container of an Azure Storage account, read over plain HTTPS.
pub struct AzureBlobContainer {
    container_url: url::Url,

    /// Shared access signature query string, without the leading `?`
    sas_token: Option<String>,

    client: reqwest::Client,
}

impl AzureBlobContainer {
    pub fn new(endpoint: &str, container: &str, sas_token: Option<String>) -> AppResult<Self> {
        let mut container_url = url::Url::parse(endpoint)
            .map_err(|e| AppError::Config(format!("Invalid storage endpoint '{}': {}", endpoint, e)))?;

        container_url
            .path_segments_mut()
            .map_err(|_| AppError::Config(format!("Storage endpoint cannot be a base: {}", endpoint)))?
            .pop_if_empty()
            .push(container);

        Ok(Self {
            container_url,
            sas_token: sas_token
                .map(|token| token.trim_start_matches('?').to_string())
                .filter(|token| !token.is_empty()),
            client: reqwest::Client::new(),
        })
    }

    /// Build a client from the `storage` config section. The SAS token, if
    /// configured, is read from its environment variable.
    pub fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let sas_token = match &config.sas_token_env {
            Some(env_var) => std::env::var(env_var).ok(),
            None => None,
        };
        Self::new(&config.endpoint, &config.container, sas_token)
    }

    fn blob_url(&self, blob_name: &str) -> AppResult<url::Url> {
        let mut url = self.container_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Storage("Container URL cannot be a base".to_string()))?
            .extend(blob_name.split('/'));
        url.set_query(self.sas_token.as_deref());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl BlobStore for AzureBlobContainer {
    async fn download(&self, blob_name: &str) -> AppResult<Option<Vec<u8>>> {
        let url = self.blob_url(blob_name)?;
        tracing::debug!("Downloading blob: {}", blob_name);

        let response = self
            .client
            .get(url)
            .header("x-ms-version", "2023-11-03")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to download {}: {}", blob_name, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Storage(format!(
                "Blob API error for {} ({}): {}",
                blob_name, status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read {}: {}", blob_name, e)))?;

        Ok(Some(bytes.to_vec()))
    }
}

/// Name of the rendered PNG for a source page.
pub fn image_blob_name(sourcepage: &str) -> String {
    let (stem, _) = split_extension(sourcepage);
    format!("{}.png", stem)
}

/// Fetch the page image for a search result as a PNG data URL.
///
/// Results without a source page, and pages whose image blob is missing,
/// yield `None`.
pub async fn fetch_image(store: &dyn BlobStore, document: &Document) -> AppResult<Option<String>> {
    let Some(sourcepage) = document.sourcepage.as_deref().filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let blob_name = image_blob_name(sourcepage);
    match store.download(&blob_name).await? {
        Some(bytes) => Ok(Some(format!("data:image/png;base64,{}", STANDARD.encode(bytes)))),
        None => {
            tracing::warn!("No blob exists for {}", blob_name);
            Ok(None)
        }
    }
}
