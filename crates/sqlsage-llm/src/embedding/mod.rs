//! Text embedding clients
//!
//! An embedding client turns text into a fixed-length vector. The selector in
//! `sqlsage-runtime` only depends on the [`EmbeddingClient`] trait.

use crate::error::Result;
use async_trait::async_trait;

mod hashing;
mod openai;

pub use hashing::HashingEmbeddings;
pub use openai::{OpenAIEmbeddings, DEFAULT_EMBEDDING_MODEL};

/// Async embedding client trait
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single query text
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of documents, preserving input order
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_query(text).await?);
        }
        Ok(out)
    }

    /// Get the name of this client
    fn name(&self) -> &str;
}
