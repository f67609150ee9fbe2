//! Error types for slipway

use thiserror::Error;

/// Main error type for the orchestrator and its surfaces
#[derive(Error, Debug)]
pub enum SlipwayError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("A deployment is already in progress")]
    ConflictError,

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for SlipwayError {
    fn from(err: anyhow::Error) -> Self {
        SlipwayError::Internal(err.to_string())
    }
}
