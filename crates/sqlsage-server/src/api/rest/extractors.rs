//! Request body extraction
//!
//! Body rejections are reported as `ServerError::InvalidRequest`, so they
//! share the `{"detail", "status"}` shape of every other API error.

use crate::error::ServerError;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

/// JSON body whose rejections become 400 responses with a readable detail
pub struct JsonExtractor<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonExtractor<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| ServerError::InvalidRequest(rejection_detail(&rejection)))
    }
}

fn rejection_detail(rejection: &JsonRejection) -> String {
    match rejection {
        // e.g. a missing `question` or a string where a number belongs
        JsonRejection::JsonDataError(err) => {
            format!("Request body does not match the expected fields: {}", err.body_text())
        }
        JsonRejection::JsonSyntaxError(err) => {
            format!("Request body is not valid JSON: {}", err.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            "Send the question as JSON with 'Content-Type: application/json'".to_string()
        }
        other => format!("Could not read request body: {}", other.body_text()),
    }
}
