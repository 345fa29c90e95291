//! Semantic database selection

use super::index::{IndexEntry, TableMetadata, VectorIndex};
use crate::database::SchemaIntrospector;
use crate::error::{Result, RuntimeError};
use serde::{Deserialize, Serialize};
use sqlsage_llm::{EmbeddingClient, LLMError};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of matches returned by [`SemanticSelector::select`]
pub const DEFAULT_TOP_K: usize = 3;

/// A table ranked by similarity to a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMatch {
    /// `alias.table`
    pub qualified_name: String,
    pub metadata: TableMetadata,
    pub distance: f32,
}

/// Picks the database whose table names best match a question
pub struct SemanticSelector {
    embedder: Arc<dyn EmbeddingClient>,
    index: VectorIndex,
    introspector: SchemaIntrospector,
}

impl SemanticSelector {
    pub fn new(embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self {
            embedder,
            index: VectorIndex::new(),
            introspector: SchemaIntrospector::default(),
        }
    }

    pub fn index_ref(&self) -> &VectorIndex {
        &self.index
    }

    /// Embed and store every user table name of the given databases
    ///
    /// Returns the number of entries written. Re-indexing overwrites entries
    /// with the same id.
    pub async fn index(&self, pool: &SqlitePool, aliases: &[String]) -> Result<usize> {
        let mut written = 0;

        for alias in aliases {
            let tables = self.introspector.list_tables(pool, alias).await?;
            if tables.is_empty() {
                debug!("No tables to index in {}", alias);
                continue;
            }

            let embeddings = self.embedder.embed_documents(&tables).await?;
            if embeddings.len() != tables.len() {
                return Err(RuntimeError::Llm(LLMError::InvalidResponse(format!(
                    "Expected {} embeddings for {}, got {}",
                    tables.len(),
                    alias,
                    embeddings.len()
                ))));
            }

            let entries: Vec<IndexEntry> = tables
                .into_iter()
                .zip(embeddings)
                .map(|(table, embedding)| {
                    IndexEntry::new(
                        TableMetadata {
                            db: alias.clone(),
                            table,
                        },
                        embedding,
                    )
                })
                .collect();

            written += entries.len();
            self.index.upsert(entries).await;
        }

        info!(
            "Indexed {} table name(s) with {} embeddings",
            written,
            self.embedder.name()
        );
        Ok(written)
    }

    /// Nearest tables to the question, best first
    ///
    /// An empty index yields an empty list without calling the embedder.
    pub async fn select(&self, question: &str, top_k: usize) -> Result<Vec<TableMatch>> {
        if self.index.is_empty().await {
            debug!("Selector index is empty");
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(question).await?;
        let hits = self.index.query(&embedding, top_k).await;

        Ok(hits
            .into_iter()
            .map(|hit| TableMatch {
                qualified_name: hit.entry.id,
                metadata: hit.entry.metadata,
                distance: hit.distance,
            })
            .collect())
    }

    /// Alias owning the single best match
    pub async fn select_database(&self, question: &str) -> Result<Option<String>> {
        Ok(self
            .select(question, 1)
            .await?
            .into_iter()
            .next()
            .map(|m| m.metadata.db))
    }

    /// Every indexed qualified table name
    pub async fn tables(&self) -> Vec<String> {
        self.index
            .entries()
            .await
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }
}
