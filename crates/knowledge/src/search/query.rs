//! Search request body.

use serde::{Deserialize, Serialize};

/// Nearest neighbours requested per vector query.
pub const VECTOR_K: u32 = 50;

/// Caption mode requested with semantic captions.
const EXTRACTIVE_CAPTIONS: &str = "extractive|highlight-false";

/// Name of the index's semantic configuration.
const SEMANTIC_CONFIGURATION: &str = "default";

/// A precomputed query vector aimed at one index field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorQuery {
    pub kind: String,
    pub vector: Vec<f32>,
    pub k: u32,
    pub fields: String,
}

impl VectorQuery {
    pub fn new(vector: Vec<f32>, field: impl Into<String>) -> Self {
        Self {
            kind: "vector".to_string(),
            vector,
            k: VECTOR_K,
            fields: field.into(),
        }
    }
}

/// Body of a `docs/search` POST.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    pub top: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector_queries: Vec<VectorQuery>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_query: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speller: Option<String>,
}

impl SearchRequest {
    /// Create a request for `top` results matching `search` text.
    ///
    /// An empty `search` string runs a pure vector query.
    pub fn new(search: impl Into<String>, top: u32) -> Self {
        Self {
            search: search.into(),
            top,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_vectors(mut self, vectors: Vec<VectorQuery>) -> Self {
        self.vector_queries = vectors;
        self
    }

    /// Turn on the semantic ranker, with extractive captions if requested.
    pub fn with_semantic_ranker(
        mut self,
        query: impl Into<String>,
        captions: bool,
        query_language: impl Into<String>,
        speller: impl Into<String>,
    ) -> Self {
        self.query_type = Some("semantic".to_string());
        self.semantic_configuration = Some(SEMANTIC_CONFIGURATION.to_string());
        self.semantic_query = Some(query.into());
        self.captions = captions.then(|| EXTRACTIVE_CAPTIONS.to_string());
        self.query_language = Some(query_language.into());
        self.speller = Some(speller.into());
        self
    }
}
