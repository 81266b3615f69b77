//! Search against the document index.

pub mod client;
pub mod filter;
pub mod query;

pub use client::{AzureSearchClient, SearchIndex};
pub use filter::{build_filter, build_security_filter, SecuritySettings};
pub use query::{SearchRequest, VectorQuery, VECTOR_K};

use crate::types::Document;
use regwise_core::AppResult;

/// Query options resolved from the request overrides.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub top: u32,
    pub filter: Option<String>,
    pub vectors: Vec<VectorQuery>,
    pub use_text_search: bool,
    pub use_vector_search: bool,
    pub use_semantic_ranker: bool,
    pub use_semantic_captions: bool,
    pub minimum_search_score: f64,
    pub minimum_reranker_score: f64,
    pub query_language: String,
    pub query_speller: String,
}

/// Build the search request for `query` under `options`.
pub fn build_request(query: &str, options: &SearchOptions) -> SearchRequest {
    let search_text = if options.use_text_search { query } else { "" };
    let vectors = if options.use_vector_search {
        options.vectors.clone()
    } else {
        Vec::new()
    };

    let request = SearchRequest::new(search_text, options.top)
        .with_filter(options.filter.clone())
        .with_vectors(vectors);

    if options.use_semantic_ranker {
        request.with_semantic_ranker(
            query,
            options.use_semantic_captions,
            &options.query_language,
            &options.query_speller,
        )
    } else {
        request
    }
}

/// Search the index and keep the hits that clear both score thresholds.
pub async fn search(
    index: &dyn SearchIndex,
    query: &str,
    options: &SearchOptions,
) -> AppResult<Vec<Document>> {
    let request = build_request(query, options);
    let documents = index.search(&request).await?;
    let total = documents.len();

    let qualified: Vec<Document> = documents
        .into_iter()
        .filter(|doc| doc.qualifies(options.minimum_search_score, options.minimum_reranker_score))
        .collect();

    if qualified.len() < total {
        tracing::debug!(
            "Dropped {} of {} results below score thresholds (search >= {}, reranker >= {})",
            total - qualified.len(),
            total,
            options.minimum_search_score,
            options.minimum_reranker_score
        );
    }

    Ok(qualified)
}
