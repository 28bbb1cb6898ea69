//! Unified error types for the BSA pipeline

use thiserror::Error;

/// Unified error type for all pipeline operations
#[derive(Error, Debug)]
pub enum BsaError {
    // Gateway errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Empty response from model {0}")]
    EmptyResponse(String),

    // Model output errors
    #[error("Failed to parse model output: {0}")]
    Parse(String),

    // Pipeline errors
    #[error("Missing artifact: {0}")]
    MissingArtifact(String),

    #[error("Invalid pipeline transition: {0}")]
    InvalidTransition(String),

    #[error("Stage {stage} failed: {reason}")]
    Stage { stage: String, reason: String },

    // Session errors
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl BsaError {
    /// Convenience constructor for stage failures
    pub fn stage(stage: impl Into<String>, reason: impl ToString) -> Self {
        Self::Stage {
            stage: stage.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using BsaError
pub type Result<T> = std::result::Result<T, BsaError>;
