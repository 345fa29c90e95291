//! OpenAI embeddings (`/v1/embeddings`)

use super::EmbeddingClient;
use crate::error::{LLMError, Result};
use crate::provider::DEFAULT_OPENAI_BASE_URL;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// OpenAI embedding client
pub struct OpenAIEmbeddings {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAIEmbeddings {
    /// Create a client for the default model
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_EMBEDDING_MODEL.to_string())
    }

    /// Create a client for a specific model
    pub fn with_model(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model,
            client: Client::new(),
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_embeddings_api(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = input.len();
        let body = EmbeddingsRequest {
            model: self.model.clone(),
            input,
        };

        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::ApiCallFailed(format!("Embedding API request failed: {}", e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LLMError::InvalidConfiguration(
                "Embedding API rejected the API key".to_string(),
            ));
        }
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(LLMError::ApiCallFailed(format!(
                "Embedding API returned {}: {}",
                status, text
            )));
        }

        let parsed: EmbeddingsResponse = resp.json().await?;
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        if data.len() != expected {
            return Err(LLMError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingClient for OpenAIEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.call_embeddings_api(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::InvalidResponse("Empty embedding response".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.call_embeddings_api(texts.to_vec()).await
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
