//! Per-request options sent alongside the chat messages.
//!
//! Every field is optional. Keys are snake_case as the web frontend sends
//! them, with camelCase aliases.

use crate::types::AuthClaims;
use serde::{Deserialize, Serialize};

/// Which retrieval signals to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Text,
    Vectors,
    Hybrid,
}

/// What retrieved material to put in front of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisionInput {
    TextAndImages,
    Texts,
    Images,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    #[serde(alias = "retrievalMode", skip_serializing_if = "Option::is_none")]
    pub retrieval_mode: Option<RetrievalMode>,

    #[serde(alias = "semanticRanker", skip_serializing_if = "Option::is_none")]
    pub semantic_ranker: Option<bool>,

    #[serde(alias = "semanticCaptions", skip_serializing_if = "Option::is_none")]
    pub semantic_captions: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,

    #[serde(alias = "minimumSearchScore", skip_serializing_if = "Option::is_none")]
    pub minimum_search_score: Option<f64>,

    #[serde(alias = "minimumRerankerScore", skip_serializing_if = "Option::is_none")]
    pub minimum_reranker_score: Option<f64>,

    #[serde(alias = "vectorFields", skip_serializing_if = "Option::is_none")]
    pub vector_fields: Option<Vec<String>>,

    #[serde(alias = "gpt4vInput", skip_serializing_if = "Option::is_none")]
    pub gpt4v_input: Option<VisionInput>,

    #[serde(alias = "promptTemplate", skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(alias = "includeCategory", skip_serializing_if = "Option::is_none")]
    pub include_category: Option<String>,

    #[serde(alias = "excludeCategory", skip_serializing_if = "Option::is_none")]
    pub exclude_category: Option<String>,

    #[serde(alias = "useOidSecurityFilter", skip_serializing_if = "Option::is_none")]
    pub use_oid_security_filter: Option<bool>,

    #[serde(alias = "useGroupsSecurityFilter", skip_serializing_if = "Option::is_none")]
    pub use_groups_security_filter: Option<bool>,
}

impl Overrides {
    /// Text search runs unless the mode is vectors-only.
    pub fn use_text_search(&self) -> bool {
        !matches!(self.retrieval_mode, Some(RetrievalMode::Vectors))
    }

    /// Vector search runs unless the mode is text-only.
    pub fn use_vector_search(&self) -> bool {
        !matches!(self.retrieval_mode, Some(RetrievalMode::Text))
    }

    pub fn use_semantic_ranker(&self) -> bool {
        self.semantic_ranker.unwrap_or(false)
    }

    pub fn use_semantic_captions(&self) -> bool {
        self.semantic_captions.unwrap_or(false)
    }

    pub fn minimum_search_score(&self) -> f64 {
        self.minimum_search_score.unwrap_or(0.0)
    }

    pub fn minimum_reranker_score(&self) -> f64 {
        self.minimum_reranker_score.unwrap_or(0.0)
    }

    /// Index fields to run vector queries against.
    pub fn vector_fields(&self) -> Vec<String> {
        self.vector_fields
            .clone()
            .unwrap_or_else(|| vec!["embedding".to_string()])
    }

    /// Whether retrieved text goes into the user message.
    pub fn send_text(&self) -> bool {
        !matches!(self.gpt4v_input, Some(VisionInput::Images))
    }

    /// Whether page images go into the user message.
    pub fn send_images(&self) -> bool {
        !matches!(self.gpt4v_input, Some(VisionInput::Texts))
    }
}

/// Request context: overrides plus the caller's claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatContext {
    pub overrides: Overrides,

    #[serde(alias = "authClaims")]
    pub auth_claims: AuthClaims,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let overrides = Overrides::default();
        assert!(overrides.use_text_search());
        assert!(overrides.use_vector_search());
        assert!(!overrides.use_semantic_ranker());
        assert!(!overrides.use_semantic_captions());
        assert_eq!(overrides.minimum_search_score(), 0.0);
        assert_eq!(overrides.vector_fields(), vec!["embedding".to_string()]);
        assert!(overrides.send_text());
        assert!(overrides.send_images());
    }

    #[test]
    fn test_retrieval_modes() {
        let text = Overrides {
            retrieval_mode: Some(RetrievalMode::Text),
            ..Default::default()
        };
        assert!(text.use_text_search());
        assert!(!text.use_vector_search());

        let vectors = Overrides {
            retrieval_mode: Some(RetrievalMode::Vectors),
            ..Default::default()
        };
        assert!(!vectors.use_text_search());
        assert!(vectors.use_vector_search());

        let hybrid = Overrides {
            retrieval_mode: Some(RetrievalMode::Hybrid),
            ..Default::default()
        };
        assert!(hybrid.use_text_search());
        assert!(hybrid.use_vector_search());
    }

    #[test]
    fn test_vision_inputs() {
        let texts = Overrides {
            gpt4v_input: Some(VisionInput::Texts),
            ..Default::default()
        };
        assert!(texts.send_text());
        assert!(!texts.send_images());

        let images = Overrides {
            gpt4v_input: Some(VisionInput::Images),
            ..Default::default()
        };
        assert!(!images.send_text());
        assert!(images.send_images());
    }

    #[test]
    fn test_deserialize_frontend_payload() {
        let context: ChatContext = serde_json::from_value(json!({
            "overrides": {
                "retrieval_mode": "hybrid",
                "semantic_ranker": true,
                "top": 5,
                "vector_fields": ["embedding", "imageEmbedding"],
                "gpt4v_input": "textAndImages",
                "exclude_category": "drafts"
            },
            "auth_claims": {"oid": "user-1", "groups": ["g1"]}
        }))
        .unwrap();

        let overrides = context.overrides;
        assert_eq!(overrides.retrieval_mode, Some(RetrievalMode::Hybrid));
        assert!(overrides.use_semantic_ranker());
        assert_eq!(overrides.top, Some(5));
        assert_eq!(overrides.vector_fields().len(), 2);
        assert_eq!(overrides.gpt4v_input, Some(VisionInput::TextAndImages));
        assert_eq!(overrides.exclude_category.as_deref(), Some("drafts"));
        assert_eq!(context.auth_claims.oid.as_deref(), Some("user-1"));
    }

    #[test]
    fn test_deserialize_camel_case_aliases() {
        let overrides: Overrides = serde_json::from_value(json!({
            "retrievalMode": "vectors",
            "semanticCaptions": true,
            "useOidSecurityFilter": true
        }))
        .unwrap();

        assert_eq!(overrides.retrieval_mode, Some(RetrievalMode::Vectors));
        assert!(overrides.use_semantic_captions());
        assert_eq!(overrides.use_oid_security_filter, Some(true));
    }
}
