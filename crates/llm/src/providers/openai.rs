//! OpenAI and Azure OpenAI provider implementation.
//!
//! Both services speak the same chat and embeddings schema and differ only in
//! URL layout and authentication:
//! - Azure: `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=...`, `api-key` header
//! - OpenAI: `{base}/v1/{operation}`, bearer token

use crate::client::{ChatClient, ChatRequest, ChatResponse, ChatRole, ChatStream, ChatStreamChunk};
use crate::embeddings::EmbeddingClient;
use crate::models::supports_dimensions;
use futures::StreamExt;
use regwise_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Which URL and auth scheme to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    Azure { api_version: String },
    OpenAi,
}

/// Streaming response chunk, as sent on the wire.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    role: Option<ChatRole>,
    #[serde(default)]
    content: Option<String>,
}

/// Embeddings API request format.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

/// Embeddings API response format.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible HTTP client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    /// Service endpoint, without trailing slash
    base_url: String,

    api_key: String,

    flavor: ApiFlavor,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for an Azure OpenAI resource.
    pub fn azure(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self::with_flavor(
            endpoint,
            api_key,
            ApiFlavor::Azure {
                api_version: api_version.into(),
            },
        )
    }

    /// Create a client for the OpenAI API or a compatible server.
    pub fn openai(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_flavor(base_url, api_key, ApiFlavor::OpenAi)
    }

    fn with_flavor(base_url: impl Into<String>, api_key: impl Into<String>, flavor: ApiFlavor) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            flavor,
            client: reqwest::Client::new(),
        }
    }

    /// Build the URL for an operation ("chat/completions", "embeddings").
    ///
    /// On Azure the model name is the deployment name.
    fn operation_url(&self, model: &str, operation: &str) -> String {
        match &self.flavor {
            ApiFlavor::Azure { api_version } => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                self.base_url, model, operation, api_version
            ),
            ApiFlavor::OpenAi => format!("{}/v1/{}", self.base_url, operation),
        }
    }

    /// POST a JSON body and fail on non-success status.
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> AppResult<reqwest::Response> {
        let builder = self.client.post(url).json(body);
        let builder = match self.flavor {
            ApiFlavor::Azure { .. } => builder.header("api-key", &self.api_key),
            ApiFlavor::OpenAi => builder.bearer_auth(&self.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "{} API error ({}): {}",
                self.provider_name(),
                status,
                error_text
            )));
        }

        Ok(response)
    }

    /// Request an embedding for one input string.
    pub async fn create_embedding(
        &self,
        model: &str,
        input: &str,
        dimensions: Option<u32>,
    ) -> AppResult<Vec<f32>> {
        let url = self.operation_url(model, "embeddings");
        let request = EmbeddingRequest {
            model,
            input,
            dimensions,
        };

        tracing::debug!("Embedding request: model={}, dimensions={:?}", model, dimensions);

        let response: EmbeddingResponse = self
            .post_json(&url, &request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse embedding response: {}", e)))?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}

#[async_trait::async_trait]
impl ChatClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        match self.flavor {
            ApiFlavor::Azure { .. } => "azure",
            ApiFlavor::OpenAi => "openai",
        }
    }

    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!("Sending chat completion request to {}", self.provider_name());
        tracing::debug!(
            "Request: model={}, messages={}, temperature={:?}, max_tokens={:?}",
            request.model,
            request.messages.len(),
            request.temperature,
            request.max_tokens
        );

        let url = self.operation_url(&request.model, "chat/completions");

        let mut body = request.clone();
        body.stream = false;

        let chat_response: ChatResponse = self
            .post_json(&url, &body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse chat response: {}", e)))?;

        tracing::info!("Received chat completion from {}", self.provider_name());
        if let Some(ref usage) = chat_response.usage {
            tracing::debug!(
                "Token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        Ok(chat_response)
    }

    async fn stream(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        tracing::info!("Starting streaming chat request to {}", self.provider_name());

        let url = self.operation_url(&request.model, "chat/completions");

        let mut body = request.clone();
        body.stream = true;

        let response = self.post_json(&url, &body).await?;

        let stream = response
            .bytes_stream()
            .scan(SseDecoder::default(), |decoder, result| {
                let events = match result {
                    Ok(bytes) => decoder.feed(&bytes),
                    Err(e) => vec![Err(AppError::Llm(format!("Stream error: {}", e)))],
                };
                futures::future::ready(Some(futures::stream::iter(events)))
            })
            .flatten();

        Ok(Box::pin(stream))
    }
}

/// Embedding client bound to one embedding model.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,

    /// Model name used to decide `dimensions` support
    model: String,

    /// Name sent on the wire: the deployment if configured, else the model
    target: String,

    dimensions: u32,
}

impl OpenAiEmbedder {
    pub fn new(
        client: OpenAiClient,
        model: impl Into<String>,
        deployment: Option<String>,
        dimensions: u32,
    ) -> Self {
        let model = model.into();
        let target = deployment.unwrap_or_else(|| model.clone());
        Self {
            client,
            model,
            target,
            dimensions,
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingClient for OpenAiEmbedder {
    fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let dimensions = supports_dimensions(&self.model).then_some(self.dimensions);
        self.client.create_embedding(&self.target, text, dimensions).await
    }
}

/// Incremental decoder for `text/event-stream` chat responses.
///
/// Bytes arrive in arbitrary slices, so partial lines are buffered until
/// their newline shows up.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl SseDecoder {
    /// Consume a slice of bytes and return every complete event in it.
    fn feed(&mut self, bytes: &[u8]) -> Vec<AppResult<ChatStreamChunk>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.finished {
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                self.finished = true;
                events.push(Ok(ChatStreamChunk {
                    done: true,
                    ..Default::default()
                }));
                continue;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                // Azure sends a leading chunk with no choices (content filter results)
                Ok(parsed) => {
                    if let Some(choice) = parsed.choices.into_iter().next() {
                        events.push(Ok(ChatStreamChunk {
                            content: choice.delta.content.unwrap_or_default(),
                            role: choice.delta.role,
                            finish_reason: choice.finish_reason,
                            done: false,
                        }));
                    }
                }
                Err(e) => events.push(Err(AppError::Llm(format!("Failed to parse chunk: {}", e)))),
            }
        }

        events
    }
}
