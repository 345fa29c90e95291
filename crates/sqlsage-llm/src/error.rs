//! Error types for the SQLSage LLM module

use thiserror::Error;

/// Result type alias for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// LLM module errors
#[derive(Debug, Error)]
pub enum LLMError {
    /// External API call failed
    #[error("External API call failed: {0}")]
    ApiCallFailed(String),

    /// Invalid configuration (missing credential, bad base URL, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// A tool invoked by the agent failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolFailed { tool: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LLMError {
    /// Build a tool failure for the named tool
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        LLMError::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

impl From<String> for LLMError {
    fn from(s: String) -> Self {
        LLMError::Other(s)
    }
}

impl From<&str> for LLMError {
    fn from(s: &str) -> Self {
        LLMError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        let err = LLMError::tool("sql_db_query", "no such table: zepto.orders");
        assert_eq!(
            err.to_string(),
            "Tool 'sql_db_query' failed: no such table: zepto.orders"
        );
    }

    #[test]
    fn test_string_conversion() {
        let err: LLMError = "boom".into();
        assert!(matches!(err, LLMError::Other(ref m) if m == "boom"));
    }
}
