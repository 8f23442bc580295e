//! Error types for voxroute
//!
//! Centralized error handling using thiserror. Every variant maps onto an
//! [`ErrorKind`] so the router can turn it into a structured response.

use thiserror::Error;

use crate::domain::ErrorKind;

/// All error types that can occur while routing an utterance
#[derive(Debug, Error)]
pub enum RouterError {
    /// Classifier unreachable, timed out, or returned something unparseable
    #[error("Classification unavailable: {0}")]
    ClassificationUnavailable(String),

    /// Page or tool name not present in the static configuration
    #[error("{0} not found")]
    UnresolvedTarget(String),

    /// Extracted or supplied data failed a domain check
    #[error("Validation failed for '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Downstream data provider failed or timed out
    #[error("Provider error from {tool}: {reason}")]
    Provider { tool: String, reason: String },

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration or domain store could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RouterError {
    /// Shorthand for a validation failure on a named field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a provider failure
    pub fn provider(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Provider {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// The response-level category this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::ClassificationUnavailable(_) | RouterError::Llm(_) => ErrorKind::ClassificationUnavailable,
            RouterError::UnresolvedTarget(_) => ErrorKind::UnresolvedTarget,
            RouterError::ValidationFailed { .. } => ErrorKind::ValidationFailure,
            RouterError::Provider { .. } => ErrorKind::ProviderFailure,
            RouterError::Config(_) | RouterError::Io(_) | RouterError::Json(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for voxroute operations
pub type Result<T> = std::result::Result<T, RouterError>;
