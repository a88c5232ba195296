//! Error types for the caching exchange
//!
//! The cache stage never raises errors on the data path: transport and
//! GraphQL failures travel inside `OperationResult` untouched. The errors
//! defined here cover configuration, parsing of caller-supplied tags and
//! documents, and failures of the pipeline driver itself.

use thiserror::Error;

/// Main error type for exchange operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A request policy tag that is not one of the four known policies
    #[error("Unknown request policy: {0}")]
    InvalidRequestPolicy(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A query document that could not be parsed
    #[error("Document error: {0}")]
    DocumentError(String),

    /// The pipeline entry queue has been closed
    #[error("Pipeline closed: {context}")]
    PipelineClosed { context: String },

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

impl From<String> for ExchangeError {
    fn from(s: String) -> Self {
        ExchangeError::Other(s)
    }
}

impl From<&str> for ExchangeError {
    fn from(s: &str) -> Self {
        ExchangeError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(e: serde_json::Error) -> Self {
        ExchangeError::SerializationError(e.to_string())
    }
}
