//! SQL toolkit handed to the agent
//!
//! Tools read table names and schema text from an injected
//! [`SchemaProvider`] and execute statements on the shared pool.

mod schema_provider;
mod tools;

pub use schema_provider::{PrecomputedSchema, SchemaProvider};
pub use tools::{
    check_read_only, InfoSqlTool, ListTablesTool, QueryCheckerTool, QuerySqlTool,
    LIST_TABLES_TOOL_NAME, QUERY_CHECKER_TOOL_NAME, SCHEMA_TOOL_NAME,
};

use crate::database::AttachedPool;
use sqlsage_llm::{LLMClient, Tool};
use std::sync::Arc;

/// The four SQL tools bound to one pool, schema and model
pub struct SqlToolkit {
    handle: Arc<AttachedPool>,
    schema: Arc<dyn SchemaProvider>,
    llm: Arc<dyn LLMClient>,
    model: String,
    max_rows: usize,
}

impl SqlToolkit {
    pub fn new(
        handle: Arc<AttachedPool>,
        schema: Arc<dyn SchemaProvider>,
        llm: Arc<dyn LLMClient>,
        model: impl Into<String>,
        max_rows: usize,
    ) -> Self {
        Self {
            handle,
            schema,
            llm,
            model: model.into(),
            max_rows,
        }
    }

    pub fn schema(&self) -> &Arc<dyn SchemaProvider> {
        &self.schema
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(QuerySqlTool::new(self.handle.clone(), self.max_rows)),
            Arc::new(InfoSqlTool::new(self.schema.clone())),
            Arc::new(ListTablesTool::new(self.schema.clone())),
            Arc::new(QueryCheckerTool::new(self.llm.clone(), self.model.clone())),
        ]
    }
}
