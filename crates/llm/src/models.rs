//! Static facts about known models.

use regwise_core::{AppError, AppResult};

/// Context window sizes, in tokens.
const TOKEN_LIMITS: &[(&str, u32)] = &[
    ("gpt-35-turbo", 4000),
    ("gpt-3.5-turbo", 4000),
    ("gpt-35-turbo-16k", 16000),
    ("gpt-3.5-turbo-16k", 16000),
    ("gpt-4", 8100),
    ("gpt-4-32k", 32000),
    ("gpt-4v", 128000),
    ("gpt-4-vision-preview", 128000),
    ("gpt-4-turbo", 128000),
    ("gpt-4o", 128000),
    ("gpt-4o-mini", 128000),
];

/// Embedding models and whether they accept a `dimensions` parameter.
const EMBEDDING_DIMENSIONS_SUPPORT: &[(&str, bool)] = &[
    ("text-embedding-ada-002", false),
    ("text-embedding-3-small", true),
    ("text-embedding-3-large", true),
];

/// Get the context window of a chat model.
pub fn get_token_limit(model: &str) -> AppResult<u32> {
    TOKEN_LIMITS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, limit)| *limit)
        .ok_or_else(|| {
            AppError::Config(format!(
                "Unknown chat model '{}'. Expected one of: {}",
                model,
                TOKEN_LIMITS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

/// Whether an embedding model accepts a `dimensions` parameter.
///
/// Unknown models are assumed not to.
pub fn supports_dimensions(model: &str) -> bool {
    EMBEDDING_DIMENSIONS_SUPPORT
        .iter()
        .any(|(name, supported)| *name == model && *supported)
}
