//! Error types for the DeepQuant backtest agent

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, DeepQuantError>;

#[derive(Error, Debug)]
pub enum DeepQuantError {

    // =============================
    // Request Errors
    // =============================

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(Uuid),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Job already exists: {0}")]
    DuplicateJob(Uuid),

    // =============================
    // Backtest Pipeline Errors
    // =============================

    #[error("Invalid strategy: {0}")]
    InvalidStrategy(String),

    #[error("{0}")]
    MarketData(String),

    #[error("Backtest error: {0}")]
    Backtest(String),

    #[error("Policy store error: {0}")]
    Store(String),

    #[error("Job queue closed")]
    QueueClosed,

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DeepQuantError {
    /// Errors caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DeepQuantError::InvalidRequest(_)
                | DeepQuantError::InvalidStrategy(_)
                | DeepQuantError::UuidError(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeepQuantError::PolicyNotFound(_) | DeepQuantError::JobNotFound(_)
        )
    }
}
