use thiserror::Error;

/// Failure taxonomy for engine operations. Nothing here is retryable from
/// inside the engine: every variant reflects either bad input or a real
/// state conflict the caller has to resolve.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing input. The message is surfaced verbatim.
    #[error("{0}")]
    Validation(String),
    /// Reference to a task or activity that does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The operation would break the single-running-activity rule.
    #[error("{0}")]
    Conflict(String),
    /// The storage medium failed underneath an otherwise valid operation.
    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.into())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Storage(value.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
