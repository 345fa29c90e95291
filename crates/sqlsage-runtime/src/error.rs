//! Runtime error types

use sqlsage_llm::LLMError;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Missing credential, missing database file, invalid alias
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// SQLite failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Model or embedding failure
    #[error("LLM error: {0}")]
    Llm(LLMError),

    /// Schema metadata could not be read
    #[error("Introspection error: {0}")]
    Introspection(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl RuntimeError {
    /// Whether the error stems from configuration rather than a request
    pub fn is_configuration(&self) -> bool {
        matches!(self, RuntimeError::Configuration(_))
    }
}

impl From<LLMError> for RuntimeError {
    fn from(err: LLMError) -> Self {
        match err {
            LLMError::InvalidConfiguration(msg) => RuntimeError::Configuration(msg),
            other => RuntimeError::Llm(other),
        }
    }
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_configuration_maps_to_configuration() {
        let err: RuntimeError = LLMError::InvalidConfiguration("no key".to_string()).into();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: no key");
    }

    #[test]
    fn test_other_llm_errors_stay_llm() {
        let err: RuntimeError = LLMError::ApiCallFailed("timeout".to_string()).into();
        assert!(matches!(err, RuntimeError::Llm(_)));
        assert!(!err.is_configuration());
    }
}
