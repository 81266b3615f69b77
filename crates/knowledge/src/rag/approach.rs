//! Retrieve-then-read over text and page images.
//!
//! One request runs a fixed sequence: vectorize the query, search the index,
//! fetch page images, build the prompt, then ask the chat model. Every
//! external call goes through a trait object so the sequence can be driven
//! by in-memory doubles.

use crate::overrides::ChatContext;
use crate::rag::types::{
    ApproachEvent, ApproachResponse, ApproachStream, DataPoints, ResponseContext, ThoughtStep,
};
use crate::search::{build_filter, search, SearchIndex, SearchOptions, SecuritySettings, VectorQuery};
use crate::sources::get_sources_content;
use crate::storage::{fetch_image, BlobStore};
use futures::StreamExt;
use regwise_core::{AppConfig, AppError, AppResult};
use regwise_llm::{
    get_token_limit, ChatClient, ChatMessage, ChatRequest, ChatStreamChunk, ContentPart,
    EmbeddingClient, MessageContent,
};
use regwise_prompt::{apply_prompt_override, build_messages, resolve_system_prompt};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Vector field served by the text embedding model. Any other field is
/// queried with the vision vectorizer.
const TEXT_VECTOR_FIELD: &str = "embedding";

/// Static settings of the approach.
#[derive(Debug, Clone)]
pub struct ApproachSettings {
    pub chat_model: String,
    pub chat_deployment: Option<String>,

    /// System prompt used when a request has no template of its own
    pub system_prompt: String,

    pub response_token_limit: u32,
    pub default_temperature: f32,
    pub default_top: u32,
    pub security: SecuritySettings,
    pub query_language: String,
    pub query_speller: String,
}

impl ApproachSettings {
    /// Read settings from configuration, resolving the workspace prompt.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let system_prompt =
            resolve_system_prompt(&config.workspace, &config.approach.prompt_id, None)?;

        Ok(Self {
            chat_model: config.openai.chat_model.clone(),
            chat_deployment: config.openai.chat_deployment.clone(),
            system_prompt,
            response_token_limit: config.approach.response_token_limit,
            default_temperature: config.approach.default_temperature,
            default_top: config.approach.default_top,
            security: SecuritySettings {
                require_access_control: config.search.require_access_control,
                has_auth_fields: config.search.has_auth_fields,
            },
            query_language: config.search.query_language.clone(),
            query_speller: config.search.query_speller.clone(),
        })
    }
}

/// Everything computed before the chat call.
struct PreparedChat {
    request: ChatRequest,
    context: ResponseContext,
}

/// Answers the last user message from retrieved passages and page images.
pub struct RetrieveThenReadVision {
    search_index: Arc<dyn SearchIndex>,
    blob_store: Arc<dyn BlobStore>,
    chat_client: Arc<dyn ChatClient>,
    text_embedder: Arc<dyn EmbeddingClient>,
    image_embedder: Option<Arc<dyn EmbeddingClient>>,
    settings: ApproachSettings,

    /// Context window of the chat model
    token_limit: u32,
}

impl RetrieveThenReadVision {
    /// Create the approach. Fails if the chat model's context window is unknown.
    pub fn new(
        search_index: Arc<dyn SearchIndex>,
        blob_store: Arc<dyn BlobStore>,
        chat_client: Arc<dyn ChatClient>,
        text_embedder: Arc<dyn EmbeddingClient>,
        image_embedder: Option<Arc<dyn EmbeddingClient>>,
        settings: ApproachSettings,
    ) -> AppResult<Self> {
        let token_limit = get_token_limit(&settings.chat_model)?;

        Ok(Self {
            search_index,
            blob_store,
            chat_client,
            text_embedder,
            image_embedder,
            settings,
            token_limit,
        })
    }

    pub fn settings(&self) -> &ApproachSettings {
        &self.settings
    }

    /// Model name sent on the wire.
    fn chat_target(&self) -> &str {
        self.settings
            .chat_deployment
            .as_deref()
            .unwrap_or(&self.settings.chat_model)
    }

    /// Answer the conversation's last message.
    pub async fn run(
        &self,
        messages: &[ChatMessage],
        session_state: Option<Value>,
        context: &ChatContext,
    ) -> AppResult<ApproachResponse> {
        let prepared = self.prepare(messages, context).await?;

        let response = self.chat_client.complete(&prepared.request).await?;
        let message = response.first_message()?.clone();

        Ok(ApproachResponse {
            message,
            context: prepared.context,
            session_state,
        })
    }

    /// Answer the conversation's last message as a stream of events.
    ///
    /// The first event carries the data points and thoughts; answer text
    /// follows as deltas.
    pub async fn run_stream(
        &self,
        messages: &[ChatMessage],
        session_state: Option<Value>,
        context: &ChatContext,
    ) -> AppResult<ApproachStream> {
        let prepared = self.prepare(messages, context).await?;

        let request = prepared.request.with_streaming();
        let chunks = self.chat_client.stream(&request).await?;

        let head = futures::stream::once(futures::future::ready(Ok(ApproachEvent::Context {
            context: prepared.context,
            session_state,
        })));
        let body = chunks.flat_map(|chunk| futures::stream::iter(chunk_events(chunk)));

        Ok(Box::pin(head.chain(body)))
    }

    async fn embed_for_field(&self, field: &str, query: &str) -> AppResult<Vec<f32>> {
        if field == TEXT_VECTOR_FIELD {
            return self.text_embedder.embed(query).await;
        }

        let embedder = self.image_embedder.as_ref().ok_or_else(|| {
            AppError::Config(format!(
                "Vector field '{}' needs the vision vectorizer, but no vision endpoint is configured",
                field
            ))
        })?;
        embedder.embed(query).await
    }

    async fn prepare(&self, messages: &[ChatMessage], context: &ChatContext) -> AppResult<PreparedChat> {
        let query = last_query(messages)?;
        let overrides = &context.overrides;

        let use_text_search = overrides.use_text_search();
        let use_vector_search = overrides.use_vector_search();
        let use_semantic_ranker = overrides.use_semantic_ranker();
        let use_semantic_captions = overrides.use_semantic_captions();
        let top = overrides.top.unwrap_or(self.settings.default_top);
        let filter = build_filter(self.settings.security, overrides, &context.auth_claims)?;
        let vector_fields = overrides.vector_fields();

        tracing::info!(
            "Answering query (text={}, vectors={}, semantic={}, top={})",
            use_text_search,
            use_vector_search,
            use_semantic_ranker,
            top
        );

        let mut vectors = Vec::new();
        if use_vector_search {
            for field in &vector_fields {
                let vector = self.embed_for_field(field, query).await?;
                vectors.push(VectorQuery::new(vector, field.as_str()));
            }
        }

        let options = SearchOptions {
            top,
            filter: filter.clone(),
            vectors,
            use_text_search,
            use_vector_search,
            use_semantic_ranker,
            use_semantic_captions,
            minimum_search_score: overrides.minimum_search_score(),
            minimum_reranker_score: overrides.minimum_reranker_score(),
            query_language: self.settings.query_language.clone(),
            query_speller: self.settings.query_speller.clone(),
        };
        let results = search(self.search_index.as_ref(), query, &options).await?;

        let sources_content = get_sources_content(&results, use_semantic_captions, true);

        let mut user_content = vec![ContentPart::text(query)];
        if overrides.send_text() {
            user_content.push(ContentPart::text(sources_content.join("\n")));
        }

        let mut images = Vec::new();
        if overrides.send_images() {
            for result in &results {
                if let Some(url) = fetch_image(self.blob_store.as_ref(), result).await? {
                    images.push(url);
                }
            }
            user_content.extend(images.iter().map(ContentPart::image));
        }

        let system_prompt = match overrides.prompt_template.as_deref() {
            Some(template) => apply_prompt_override(template, &self.settings.system_prompt),
            None => self.settings.system_prompt.clone(),
        };

        let response_token_limit = self.settings.response_token_limit;
        let built = build_messages(
            &self.settings.chat_model,
            &system_prompt,
            user_content,
            self.token_limit.saturating_sub(response_token_limit),
        );

        let temperature = overrides
            .temperature
            .unwrap_or(self.settings.default_temperature);

        let search_props = json!({
            "use_semantic_captions": use_semantic_captions,
            "use_semantic_ranker": use_semantic_ranker,
            "top": top,
            "filter": filter,
            "vector_fields": vector_fields,
            "use_vector_search": use_vector_search,
            "use_text_search": use_text_search,
        });
        let model_props = match &self.settings.chat_deployment {
            Some(deployment) => json!({"model": self.settings.chat_model, "deployment": deployment}),
            None => json!({"model": self.settings.chat_model}),
        };

        let thoughts = vec![
            ThoughtStep::new("Search using user query", query).with_props(into_map(search_props)),
            ThoughtStep::new(
                "Search results",
                results
                    .iter()
                    .map(|result| result.serialize_for_results())
                    .collect::<Vec<_>>(),
            ),
            ThoughtStep::new(
                "Prompt to generate answer",
                built
                    .messages
                    .iter()
                    .map(|message| message.to_string())
                    .collect::<Vec<_>>(),
            )
            .with_props(into_map(model_props)),
        ];

        let request = ChatRequest::new(self.chat_target(), built.messages)
            .with_temperature(temperature)
            .with_max_tokens(response_token_limit)
            .with_choices(1);

        Ok(PreparedChat {
            request,
            context: ResponseContext {
                data_points: DataPoints {
                    text: sources_content,
                    images,
                },
                thoughts,
            },
        })
    }
}

/// The query is the text of the last message.
fn last_query(messages: &[ChatMessage]) -> AppResult<&str> {
    match messages.last().map(|message| &message.content) {
        Some(MessageContent::Text(text)) => Ok(text),
        _ => Err(AppError::InvalidRequest(
            "The most recent message content must be a string.".to_string(),
        )),
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn chunk_events(chunk: AppResult<ChatStreamChunk>) -> Vec<AppResult<ApproachEvent>> {
    let chunk = match chunk {
        Ok(chunk) => chunk,
        Err(e) => return vec![Err(e)],
    };

    let mut events = Vec::new();
    if !chunk.content.is_empty() || chunk.role.is_some() {
        events.push(Ok(ApproachEvent::Delta {
            role: chunk.role,
            content: chunk.content,
        }));
    }
    if let Some(finish_reason) = chunk.finish_reason {
        events.push(Ok(ApproachEvent::Finished { finish_reason }));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overrides::{Overrides, RetrievalMode, VisionInput};
    use crate::search::SearchRequest;
    use crate::types::{AuthClaims, Document};
    use regwise_llm::{ChatChoice, ChatResponse, ChatRole, ChatStream, ResponseMessage};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockIndex {
        documents: Vec<Document>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    #[async_trait::async_trait]
    impl SearchIndex for MockIndex {
        async fn search(&self, request: &SearchRequest) -> AppResult<Vec<Document>> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.documents.clone())
        }
    }

    struct MockBlobs(HashMap<String, Vec<u8>>);

    #[async_trait::async_trait]
    impl BlobStore for MockBlobs {
        async fn download(&self, blob_name: &str) -> AppResult<Option<Vec<u8>>> {
            Ok(self.0.get(blob_name).cloned())
        }
    }

    #[derive(Default)]
    struct MockChat {
        requests: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait::async_trait]
    impl ChatClient for MockChat {
        fn provider_name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(ChatResponse {
                id: "cmpl".to_string(),
                model: request.model.clone(),
                choices: vec![ChatChoice {
                    index: 0,
                    message: ResponseMessage {
                        role: ChatRole::Assistant,
                        content: Some("Register with the card networks [payfac-1.png].".to_string()),
                    },
                    finish_reason: Some("stop".to_string()),
                }],
                usage: None,
            })
        }

        async fn stream(&self, request: &ChatRequest) -> AppResult<ChatStream> {
            self.requests.lock().unwrap().push(request.clone());
            let chunks = vec![
                Ok(ChatStreamChunk {
                    role: Some(ChatRole::Assistant),
                    ..Default::default()
                }),
                Ok(ChatStreamChunk {
                    content: "Register".to_string(),
                    ..Default::default()
                }),
                Ok(ChatStreamChunk {
                    content: " now.".to_string(),
                    finish_reason: Some("stop".to_string()),
                    ..Default::default()
                }),
                Ok(ChatStreamChunk {
                    done: true,
                    ..Default::default()
                }),
            ];
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    struct MockEmbedder {
        name: &'static str,
        vector: Vec<f32>,
        calls: Mutex<Vec<String>>,
    }

    impl MockEmbedder {
        fn new(name: &'static str, vector: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                name,
                vector,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingClient for MockEmbedder {
        fn provider_name(&self) -> &str {
            self.name
        }

        async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
            self.calls.lock().unwrap().push(text.to_string());
            Ok(self.vector.clone())
        }
    }

    struct Harness {
        index: Arc<MockIndex>,
        chat: Arc<MockChat>,
        text: Arc<MockEmbedder>,
        image: Arc<MockEmbedder>,
        approach: RetrieveThenReadVision,
    }

    fn document(id: &str, sourcepage: &str, content: &str, score: f64) -> Document {
        Document {
            id: Some(id.to_string()),
            sourcepage: Some(sourcepage.to_string()),
            content: Some(content.to_string()),
            embedding: Some(vec![0.1, 0.2, 0.3]),
            score: Some(score),
            ..Default::default()
        }
    }

    fn settings() -> ApproachSettings {
        ApproachSettings {
            chat_model: "gpt-4o".to_string(),
            chat_deployment: None,
            system_prompt: "You answer compliance questions.".to_string(),
            response_token_limit: 1024,
            default_temperature: 0.3,
            default_top: 3,
            security: SecuritySettings::default(),
            query_language: "en-us".to_string(),
            query_speller: "lexicon".to_string(),
        }
    }

    fn harness_with(settings: ApproachSettings, with_vision: bool) -> Harness {
        let index = Arc::new(MockIndex {
            documents: vec![
                document("1", "payfac-1.png", "PayFacs must\nregister.", 0.9),
                document("2", "payfac-2.png", "Sub-merchants need KYC.", 0.2),
            ],
            requests: Mutex::new(Vec::new()),
        });
        let blobs = Arc::new(MockBlobs(HashMap::from([(
            "payfac-1.png".to_string(),
            b"page one".to_vec(),
        )])));
        let chat = Arc::new(MockChat::default());
        let text = MockEmbedder::new("text", vec![1.0, 0.0]);
        let image = MockEmbedder::new("vision", vec![0.0, 1.0]);

        let image_embedder: Option<Arc<dyn EmbeddingClient>> = if with_vision {
            Some(image.clone())
        } else {
            None
        };

        let approach = RetrieveThenReadVision::new(
            index.clone(),
            blobs,
            chat.clone(),
            text.clone(),
            image_embedder,
            settings,
        )
        .unwrap();

        Harness {
            index,
            chat,
            text,
            image,
            approach,
        }
    }

    fn harness() -> Harness {
        harness_with(settings(), true)
    }

    fn question() -> Vec<ChatMessage> {
        vec![ChatMessage::user("What is required to become a PayFac?")]
    }

    fn with_overrides(overrides: Overrides) -> ChatContext {
        ChatContext {
            overrides,
            auth_claims: AuthClaims::default(),
        }
    }

    fn user_parts(request: &ChatRequest) -> Vec<ContentPart> {
        match &request.messages[1].content {
            MessageContent::Parts(parts) => parts.clone(),
            MessageContent::Text(_) => panic!("expected multimodal user content"),
        }
    }

    #[tokio::test]
    async fn test_run_defaults() {
        let h = harness();
        let response = h
            .approach
            .run(&question(), Some(json!({"turn": 1})), &ChatContext::default())
            .await
            .unwrap();

        // Hybrid search with the text embedding only
        let search = h.index.requests.lock().unwrap()[0].clone();
        assert_eq!(search.search, "What is required to become a PayFac?");
        assert_eq!(search.top, 3);
        assert!(search.filter.is_none());
        assert_eq!(search.vector_queries.len(), 1);
        assert_eq!(search.vector_queries[0].fields, "embedding");
        assert_eq!(search.vector_queries[0].k, 50);
        assert!(search.query_type.is_none());
        assert_eq!(h.text.calls.lock().unwrap().len(), 1);
        assert!(h.image.calls.lock().unwrap().is_empty());

        // Chat request parameters
        let request = h.chat.requests.lock().unwrap()[0].clone();
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(1024));
        assert_eq!(request.n, Some(1));
        assert!(!request.stream);
        assert_eq!(
            request.messages[0].content.as_text(),
            Some("You answer compliance questions.")
        );

        // Question, sources text, and the one image that exists
        let parts = user_parts(&request);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], ContentPart::text("What is required to become a PayFac?"));
        assert_eq!(
            parts[1],
            ContentPart::text(
                "payfac-1.png: PayFacs must register.\npayfac-2.png: Sub-merchants need KYC."
            )
        );
        assert_eq!(parts[2], ContentPart::image("data:image/png;base64,cGFnZSBvbmU="));

        assert_eq!(
            response.message.content.as_deref(),
            Some("Register with the card networks [payfac-1.png].")
        );
        assert_eq!(response.session_state, Some(json!({"turn": 1})));
        assert_eq!(response.context.data_points.text.len(), 2);
        assert_eq!(
            response.context.data_points.images,
            vec!["data:image/png;base64,cGFnZSBvbmU=".to_string()]
        );
    }

    #[tokio::test]
    async fn test_run_thoughts() {
        let h = harness();
        let response = h
            .approach
            .run(&question(), None, &ChatContext::default())
            .await
            .unwrap();

        let thoughts = &response.context.thoughts;
        assert_eq!(thoughts.len(), 3);

        assert_eq!(thoughts[0].title, "Search using user query");
        assert_eq!(thoughts[0].description, json!("What is required to become a PayFac?"));
        let props = thoughts[0].props.as_ref().unwrap();
        assert_eq!(props["top"], 3);
        assert_eq!(props["filter"], Value::Null);
        assert_eq!(props["vector_fields"], json!(["embedding"]));
        assert_eq!(props["use_vector_search"], true);
        assert_eq!(props["use_text_search"], true);
        assert_eq!(props["use_semantic_ranker"], false);

        assert_eq!(thoughts[1].title, "Search results");
        assert_eq!(thoughts[1].description[0]["embedding"], "[0.1, 0.2 ...+1 more]");

        assert_eq!(thoughts[2].title, "Prompt to generate answer");
        let prompt = thoughts[2].description.as_array().unwrap();
        assert_eq!(prompt.len(), 2);
        assert!(prompt[0].as_str().unwrap().contains("\"role\":\"system\""));
        assert_eq!(thoughts[2].props, Some(into_map(json!({"model": "gpt-4o"}))));
    }

    #[tokio::test]
    async fn test_run_forwards_overrides() {
        let mut settings = settings();
        settings.chat_deployment = Some("vision-chat".to_string());
        let h = harness_with(settings, true);

        let overrides = Overrides {
            retrieval_mode: Some(RetrievalMode::Hybrid),
            semantic_ranker: Some(true),
            semantic_captions: Some(true),
            top: Some(5),
            temperature: Some(0.7),
            vector_fields: Some(vec!["embedding".to_string(), "imageEmbedding".to_string()]),
            exclude_category: Some("drafts".to_string()),
            minimum_search_score: Some(0.5),
            ..Default::default()
        };

        let response = h
            .approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let search = h.index.requests.lock().unwrap()[0].clone();
        assert_eq!(search.top, 5);
        assert_eq!(search.filter.as_deref(), Some("category ne 'drafts'"));
        assert_eq!(search.query_type.as_deref(), Some("semantic"));
        assert_eq!(search.captions.as_deref(), Some("extractive|highlight-false"));
        assert_eq!(search.query_language.as_deref(), Some("en-us"));
        let fields: Vec<_> = search.vector_queries.iter().map(|v| v.fields.as_str()).collect();
        assert_eq!(fields, vec!["embedding", "imageEmbedding"]);
        assert_eq!(search.vector_queries[1].vector, vec![0.0, 1.0]);
        assert_eq!(h.image.calls.lock().unwrap().len(), 1);

        // The low-scoring hit is dropped
        assert_eq!(response.context.data_points.text.len(), 1);

        let request = h.chat.requests.lock().unwrap()[0].clone();
        assert_eq!(request.model, "vision-chat");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(
            response.context.thoughts[2].props,
            Some(into_map(json!({"model": "gpt-4o", "deployment": "vision-chat"})))
        );
    }

    #[tokio::test]
    async fn test_text_retrieval_skips_vectors() {
        let h = harness();
        let overrides = Overrides {
            retrieval_mode: Some(RetrievalMode::Text),
            ..Default::default()
        };

        h.approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let search = h.index.requests.lock().unwrap()[0].clone();
        assert!(search.vector_queries.is_empty());
        assert!(h.text.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_vector_retrieval_has_empty_search_text() {
        let h = harness();
        let overrides = Overrides {
            retrieval_mode: Some(RetrievalMode::Vectors),
            ..Default::default()
        };

        h.approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let search = h.index.requests.lock().unwrap()[0].clone();
        assert_eq!(search.search, "");
        assert_eq!(search.vector_queries.len(), 1);
    }

    #[tokio::test]
    async fn test_texts_only_input() {
        let h = harness();
        let overrides = Overrides {
            gpt4v_input: Some(VisionInput::Texts),
            ..Default::default()
        };

        let response = h
            .approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let parts = user_parts(&h.chat.requests.lock().unwrap()[0]);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| matches!(p, ContentPart::Text { .. })));
        assert!(response.context.data_points.images.is_empty());
    }

    #[tokio::test]
    async fn test_images_only_input() {
        let h = harness();
        let overrides = Overrides {
            gpt4v_input: Some(VisionInput::Images),
            ..Default::default()
        };

        let response = h
            .approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let parts = user_parts(&h.chat.requests.lock().unwrap()[0]);
        assert_eq!(parts.len(), 2);
        assert!(matches!(parts[1], ContentPart::ImageUrl { .. }));
        // Sources text is still reported
        assert_eq!(response.context.data_points.text.len(), 2);
    }

    #[tokio::test]
    async fn test_prompt_template_override() {
        let h = harness();
        let overrides = Overrides {
            prompt_template: Some("{{default_prompt}} Answer in one sentence.".to_string()),
            ..Default::default()
        };

        h.approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap();

        let request = h.chat.requests.lock().unwrap()[0].clone();
        let system = request.messages[0].content.as_text().unwrap();
        assert_eq!(
            system,
            "You answer compliance questions. Answer in one sentence."
        );
    }

    #[tokio::test]
    async fn test_prompt_template_sent_verbatim() {
        for template in ["Reply as JSON like {{answer}} only.", "Use {{#if x}} literally", ""] {
            let h = harness();
            let overrides = Overrides {
                prompt_template: Some(template.to_string()),
                ..Default::default()
            };

            h.approach
                .run(&question(), None, &with_overrides(overrides))
                .await
                .unwrap();

            let request = h.chat.requests.lock().unwrap()[0].clone();
            assert_eq!(request.messages[0].content.as_text(), Some(template));
        }
    }

    #[tokio::test]
    async fn test_security_filter_from_claims() {
        let mut settings = settings();
        settings.security = SecuritySettings {
            require_access_control: true,
            has_auth_fields: true,
        };
        let h = harness_with(settings, true);

        let context = ChatContext {
            overrides: Overrides::default(),
            auth_claims: AuthClaims {
                oid: Some("user-1".to_string()),
                groups: vec!["compliance".to_string()],
            },
        };

        h.approach.run(&question(), None, &context).await.unwrap();

        let search = h.index.requests.lock().unwrap()[0].clone();
        assert_eq!(
            search.filter.as_deref(),
            Some(
                "(oids/any(g:search.in(g, 'user-1')) or groups/any(g:search.in(g, 'compliance')))"
            )
        );
    }

    #[tokio::test]
    async fn test_non_text_last_message() {
        let h = harness();
        let messages = vec![ChatMessage::user_parts(vec![ContentPart::text("hi")])];

        let err = h
            .approach
            .run(&messages, None, &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(err.to_string().contains("must be a string"));

        let err = h
            .approach
            .run(&[], None, &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(h.index.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_image_field_without_vision() {
        let h = harness_with(settings(), false);
        let overrides = Overrides {
            vector_fields: Some(vec!["imageEmbedding".to_string()]),
            ..Default::default()
        };

        let err = h
            .approach
            .run(&question(), None, &with_overrides(overrides))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_unknown_chat_model() {
        let mut settings = settings();
        settings.chat_model = "llama3".to_string();

        let result = RetrieveThenReadVision::new(
            Arc::new(MockIndex {
                documents: vec![],
                requests: Mutex::new(Vec::new()),
            }),
            Arc::new(MockBlobs(HashMap::new())),
            Arc::new(MockChat::default()),
            MockEmbedder::new("text", vec![]),
            None,
            settings,
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_stream_events() {
        let h = harness();
        let events: Vec<ApproachEvent> = h
            .approach
            .run_stream(&question(), Some(json!("state")), &ChatContext::default())
            .await
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;

        match &events[0] {
            ApproachEvent::Context {
                context,
                session_state,
            } => {
                assert_eq!(context.thoughts.len(), 3);
                assert_eq!(context.data_points.images.len(), 1);
                assert_eq!(session_state, &Some(json!("state")));
            }
            other => panic!("expected context event, got {:?}", other),
        }

        let text: String = events
            .iter()
            .filter_map(|event| match event {
                ApproachEvent::Delta { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Register now.");

        assert_eq!(
            events.last(),
            Some(&ApproachEvent::Finished {
                finish_reason: "stop".to_string()
            })
        );
        assert!(h.chat.requests.lock().unwrap()[0].stream);
    }
}
