//! Table-name similarity search

mod index;
mod semantic;

pub use index::{cosine_distance, IndexEntry, ScoredEntry, TableMetadata, VectorIndex};
pub use semantic::{SemanticSelector, TableMatch, DEFAULT_TOP_K};
