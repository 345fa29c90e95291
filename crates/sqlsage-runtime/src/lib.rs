//! SQLSage Runtime - answering questions over attached SQLite databases
//!
//! This crate holds everything between the HTTP layer and the model:
//! the shared connection with every database attached, schema introspection,
//! the table-name similarity index, the SQL toolkit and the agent factory,
//! composed by [`QueryGateway`].

pub mod agent_factory;
pub mod database;
pub mod error;
pub mod gateway;
pub mod selector;
pub mod toolkit;

// Re-export main types
pub use agent_factory::{AgentFactory, AgentSettings, LlmCredentials, SqlAgent, PLACEHOLDER_API_KEY};
pub use database::{
    AttachedDatabase, AttachedPool, ColumnInfo, ConnectionRegistry, MainDatabasePolicy,
    RegistryConfig, SchemaDescription, SchemaIntrospector, TableDescriptor,
};
pub use error::{Result, RuntimeError};
pub use gateway::{HealthReport, QueryGateway, QueryRequest, QueryResponse};
pub use selector::{IndexEntry, SemanticSelector, TableMatch, TableMetadata, VectorIndex};
pub use toolkit::{PrecomputedSchema, SchemaProvider, SqlToolkit};
