//! Server error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlsage_runtime::RuntimeError;
use thiserror::Error;

/// Server error type
///
/// Rendered as `{"detail": <message>, "status": <code>}`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing credential or database file
    #[error("{0}")]
    Configuration(String),

    /// Any other failure while answering
    #[error("Error processing request: {0}")]
    Processing(String),

    /// Health probe failed
    #[error("Health check failed: {0}")]
    Unhealthy(String),

    /// Invalid request
    #[error("{0}")]
    InvalidRequest(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Configuration(_)
            | ServerError::Processing(_)
            | ServerError::Unhealthy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "detail": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

impl From<RuntimeError> for ServerError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Configuration(msg) => ServerError::Configuration(msg),
            RuntimeError::InvalidOperation(msg) => ServerError::InvalidRequest(msg),
            other => ServerError::Processing(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Processing(format!("{:#}", err))
    }
}
