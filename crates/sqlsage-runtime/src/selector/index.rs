//! In-memory similarity index of table names

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Owner of an indexed table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Alias of the owning database
    pub db: String,

    /// Bare table name
    pub table: String,
}

/// One indexed table name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// `alias.table`
    pub id: String,

    /// Text the entry stands for (same as the id)
    pub document: String,

    pub embedding: Vec<f32>,

    pub metadata: TableMetadata,
}

impl IndexEntry {
    pub fn new(metadata: TableMetadata, embedding: Vec<f32>) -> Self {
        let id = format!("{}.{}", metadata.db, metadata.table);
        Self {
            document: id.clone(),
            id,
            embedding,
            metadata,
        }
    }
}

/// A ranked index hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub entry: IndexEntry,
    pub distance: f32,
}

/// Index of table name embeddings keyed by id
///
/// Written at startup, read by every request.
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: RwLock<BTreeMap<String, IndexEntry>>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace entries; the last write for an id wins
    pub async fn upsert(&self, entries: Vec<IndexEntry>) {
        let mut guard = self.entries.write().await;
        for entry in entries {
            guard.insert(entry.id.clone(), entry);
        }
    }

    /// The `n` nearest entries by ascending cosine distance, ties by id
    pub async fn query(&self, embedding: &[f32], n: usize) -> Vec<ScoredEntry> {
        let guard = self.entries.read().await;
        let mut scored: Vec<ScoredEntry> = guard
            .values()
            .map(|entry| ScoredEntry {
                distance: cosine_distance(embedding, &entry.embedding),
                entry: entry.clone(),
            })
            .collect();

        // BTreeMap iteration is id-ordered, so a stable sort keeps ties by id
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(n);
        scored
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All entries in id order
    pub async fn entries(&self) -> Vec<IndexEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// Cosine distance (`1 - cosine similarity`)
///
/// Mismatched lengths and zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return f32::MAX;
    }

    1.0 - (dot / (mag_a * mag_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(db: &str, table: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry::new(
            TableMetadata {
                db: db.to_string(),
                table: table.to_string(),
            },
            embedding,
        )
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[1.0], &[1.0, 0.0]), f32::MAX);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), f32::MAX);
    }

    #[test]
    fn test_entry_id() {
        let e = entry("zepto", "products", vec![1.0]);
        assert_eq!(e.id, "zepto.products");
        assert_eq!(e.document, "zepto.products");
    }

    #[tokio::test]
    async fn test_query_ranks_and_truncates() {
        let index = VectorIndex::new();
        index
            .upsert(vec![
                entry("zepto", "orders", vec![0.0, 1.0]),
                entry("blinkit", "products", vec![1.0, 0.1]),
                entry("zepto", "products", vec![1.0, 0.0]),
            ])
            .await;

        let hits = index.query(&[1.0, 0.0], 2).await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entry.id, "zepto.products");
        assert_eq!(hits[1].entry.id, "blinkit.products");
    }

    #[tokio::test]
    async fn test_ties_broken_by_id() {
        let index = VectorIndex::new();
        index
            .upsert(vec![
                entry("zepto", "products", vec![1.0, 0.0]),
                entry("blinkit", "products", vec![1.0, 0.0]),
            ])
            .await;

        let hits = index.query(&[1.0, 0.0], 1).await;
        assert_eq!(hits[0].entry.id, "blinkit.products");
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let index = VectorIndex::new();
        index.upsert(vec![entry("zepto", "products", vec![1.0, 0.0])]).await;
        index.upsert(vec![entry("zepto", "products", vec![0.0, 1.0])]).await;

        assert_eq!(index.len().await, 1);
        assert_eq!(index.entries().await[0].embedding, vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = VectorIndex::new();
        assert!(index.is_empty().await);
        assert!(index.query(&[1.0], 3).await.is_empty());
    }
}
