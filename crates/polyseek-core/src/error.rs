//! Error types for polyseek

use thiserror::Error;

/// Result type alias using PolyseekError
pub type Result<T> = std::result::Result<T, PolyseekError>;

/// Error type alias for convenience
pub type Error = PolyseekError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for polyseek
#[derive(Debug, Error)]
pub enum PolyseekError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Query expansion failed: {0}")]
    ExpansionFailed(String),

    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Rerank failed: {0}")]
    RerankFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl PolyseekError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidRequest(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Http(_) | Self::ExternalService(_)
        )
    }
}
