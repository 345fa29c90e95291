//! Attached SQLite databases
//!
//! - [`ConnectionRegistry`] owns the one shared pool with every database attached
//! - [`SchemaIntrospector`] renders the schema description handed to the agent

pub mod config;
pub mod introspect;
pub mod registry;
pub mod value;

pub use config::{AttachedDatabase, MainDatabasePolicy, RegistryConfig};
pub use introspect::{ColumnInfo, SchemaDescription, SchemaIntrospector, TableDescriptor};
pub use registry::{AttachedPool, ConnectionRegistry};
