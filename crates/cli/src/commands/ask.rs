//! Ask command handler.
//!
//! Runs the retrieve-then-read approach for one question and renders the
//! answer with numbered citations.

use clap::Args;
use futures::StreamExt;
use regwise_core::{config::AppConfig, AppError, AppResult};
use regwise_knowledge::rag::{
    citation_file_path, parse_answer, strip_footnote_markers, AnswerFragment, ThoughtStep,
};
use regwise_knowledge::{
    build_approach, ApproachEvent, ApproachResponse, AuthClaims, ChatContext, Overrides,
    RetrievalMode, VisionInput,
};
use regwise_llm::ChatMessage;
use serde_json::Value;
use std::io::Write;

/// Ask a compliance question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Retrieval signals (text, vectors, hybrid)
    #[arg(long, value_parser = parse_retrieval_mode)]
    pub retrieval_mode: Option<RetrievalMode>,

    /// Rerank results with the semantic ranker
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub semantic_ranker: Option<bool>,

    /// Send semantic captions instead of full passages
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub semantic_captions: Option<bool>,

    /// Number of results to retrieve
    #[arg(long)]
    pub top: Option<u32>,

    #[arg(long)]
    pub minimum_search_score: Option<f64>,

    #[arg(long)]
    pub minimum_reranker_score: Option<f64>,

    /// Vector field to query (repeatable: embedding, imageEmbedding)
    #[arg(long = "vector-field")]
    pub vector_fields: Vec<String>,

    /// Material sent to the model (textAndImages, texts, images)
    #[arg(long, value_parser = parse_vision_input)]
    pub gpt4v_input: Option<VisionInput>,

    /// System prompt sent as written; `{{default_prompt}}` expands to the active prompt
    #[arg(long)]
    pub prompt_template: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Only search documents in this category
    #[arg(long)]
    pub include_category: Option<String>,

    /// Skip documents in this category
    #[arg(long)]
    pub exclude_category: Option<String>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub use_oid_security_filter: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub use_groups_security_filter: Option<bool>,

    /// Caller object id for security filtering
    #[arg(long)]
    pub oid: Option<String>,

    /// Caller group id for security filtering (repeatable)
    #[arg(long = "group")]
    pub groups: Vec<String>,

    /// Session state JSON, echoed back in the response
    #[arg(long)]
    pub session_state: Option<String>,

    /// Stream the answer as it is generated
    #[arg(long)]
    pub stream: bool,

    /// Output the full response as JSON (one event per line when streaming)
    #[arg(long)]
    pub json: bool,

    /// Print the approach's thought steps to stderr
    #[arg(long)]
    pub thoughts: bool,
}

fn parse_retrieval_mode(value: &str) -> Result<RetrievalMode, String> {
    serde_json::from_value(Value::String(value.to_string()))
        .map_err(|_| format!("unknown retrieval mode '{}' (text, vectors, hybrid)", value))
}

fn parse_vision_input(value: &str) -> Result<VisionInput, String> {
    serde_json::from_value(Value::String(value.to_string())).map_err(|_| {
        format!(
            "unknown input kind '{}' (textAndImages, texts, images)",
            value
        )
    })
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.question.trim().is_empty() {
            return Err(AppError::InvalidRequest("No question provided".to_string()));
        }

        config.validate()?;

        let context = self.chat_context();
        let session_state = self.session_state()?;
        let messages = vec![ChatMessage::user(self.question.as_str())];
        let approach = build_approach(config)?;

        if self.stream {
            self.handle_streaming(&approach, &messages, session_state, &context, config)
                .await
        } else {
            let response = approach.run(&messages, session_state, &context).await?;
            self.render_response(&response, config)
        }
    }

    /// Per-request overrides from the command-line flags.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            retrieval_mode: self.retrieval_mode,
            semantic_ranker: self.semantic_ranker,
            semantic_captions: self.semantic_captions,
            top: self.top,
            minimum_search_score: self.minimum_search_score,
            minimum_reranker_score: self.minimum_reranker_score,
            vector_fields: (!self.vector_fields.is_empty()).then(|| self.vector_fields.clone()),
            gpt4v_input: self.gpt4v_input,
            prompt_template: self.prompt_template.clone(),
            temperature: self.temperature,
            include_category: self.include_category.clone(),
            exclude_category: self.exclude_category.clone(),
            use_oid_security_filter: self.use_oid_security_filter,
            use_groups_security_filter: self.use_groups_security_filter,
        }
    }

    pub fn chat_context(&self) -> ChatContext {
        ChatContext {
            overrides: self.overrides(),
            auth_claims: AuthClaims {
                oid: self.oid.clone(),
                groups: self.groups.clone(),
            },
        }
    }

    fn session_state(&self) -> AppResult<Option<Value>> {
        self.session_state
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    AppError::InvalidRequest(format!("Session state is not valid JSON: {}", e))
                })
            })
            .transpose()
    }

    fn render_response(&self, response: &ApproachResponse, config: &AppConfig) -> AppResult<()> {
        if self.thoughts {
            print_thoughts(&response.context.thoughts)?;
        }

        if self.json {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        let answer = response.message.content.as_deref().unwrap_or_default();
        println!("{}", render_answer(answer, &config.approach.citation_base_url));

        Ok(())
    }

    /// Handle streaming response.
    async fn handle_streaming(
        &self,
        approach: &regwise_knowledge::RetrieveThenReadVision,
        messages: &[ChatMessage],
        session_state: Option<Value>,
        context: &ChatContext,
        config: &AppConfig,
    ) -> AppResult<()> {
        tracing::info!("Starting streaming answer");

        let mut stream = approach
            .run_stream(messages, session_state, context)
            .await?;
        let mut answer = String::new();

        while let Some(event) = stream.next().await {
            let event = event?;

            if self.json {
                let line = serde_json::to_string(&event)
                    .map_err(|e| AppError::Serialization(e.to_string()))?;
                println!("{}", line);
            }

            match event {
                ApproachEvent::Context { context, .. } => {
                    if self.thoughts {
                        print_thoughts(&context.thoughts)?;
                    }
                }
                ApproachEvent::Delta { content, .. } => {
                    if !self.json {
                        print!("{}", content);
                        std::io::stdout().flush().ok();
                    }
                    answer.push_str(&content);
                }
                ApproachEvent::Finished { finish_reason } => {
                    tracing::debug!("Answer finished: {}", finish_reason);
                }
            }
        }

        if !self.json {
            println!();
            let list = citation_list(&answer, &config.approach.citation_base_url);
            if !list.is_empty() {
                println!("\n{}", list);
            }
        }

        Ok(())
    }
}

fn print_thoughts(thoughts: &[ThoughtStep]) -> AppResult<()> {
    for step in thoughts {
        let description = match &step.description {
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other)
                .map_err(|e| AppError::Serialization(e.to_string()))?,
        };
        eprintln!("== {} ==\n{}", step.title, description);
        if let Some(props) = &step.props {
            let props = serde_json::to_string(props)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            eprintln!("{}", props);
        }
        eprintln!();
    }
    Ok(())
}

/// Render an answer with `[n]` citation markers and a numbered source list.
pub fn render_answer(answer: &str, citation_base_url: &str) -> String {
    let answer = strip_footnote_markers(answer);
    let parsed = parse_answer(&answer, false);

    let mut body = String::new();
    for fragment in &parsed.fragments {
        match fragment {
            AnswerFragment::Text { text } | AnswerFragment::Bold { text } => body.push_str(text),
            AnswerFragment::Citation { index, .. } => body.push_str(&format!("[{}]", index)),
        }
    }

    let list = citation_list(&answer, citation_base_url);
    if list.is_empty() {
        body
    } else {
        format!("{}\n\n{}", body, list)
    }
}

/// Numbered `[n] citation (path)` lines, footnote markers excluded.
fn citation_list(answer: &str, citation_base_url: &str) -> String {
    parse_answer(&strip_footnote_markers(answer), false)
        .citations
        .iter()
        .enumerate()
        .map(|(i, citation)| {
            format!(
                "[{}] {} ({})",
                i + 1,
                citation,
                citation_file_path(citation_base_url, citation)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
