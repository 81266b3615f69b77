//! Error types for regwise.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, the language model, the search
//! index, blob storage, prompts and malformed requests.

use thiserror::Error;

/// Unified error type for regwise.
///
/// All fallible functions in the workspace return `Result<T, AppError>`.
/// Failures from the external services are mapped into the matching variant
/// and propagated unchanged; nothing is retried.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chat completion, embedding and vectorization errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Search index errors
    #[error("Search error: {0}")]
    Search(String),

    /// Blob storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The caller sent a request the approach cannot answer
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
