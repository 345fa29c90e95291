//! Question answering over the attached databases
//!
//! One call to [`QueryGateway::ask`] resolves the target alias, loads that
//! alias's schema, runs a fresh agent and recovers the executed SQL.

use crate::agent_factory::AgentFactory;
use crate::database::{ConnectionRegistry, SchemaIntrospector};
use crate::error::{Result, RuntimeError};
use crate::selector::{SemanticSelector, TableMatch, DEFAULT_TOP_K};
use crate::toolkit::PrecomputedSchema;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sqlsage_llm::{extract_sql, AgentOutput, AgentStep, SQL_NOT_FOUND};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cache key of the all-databases schema; never a valid alias
pub const FULL_SCHEMA_KEY: &str = "*";

/// A natural-language question with optional targeting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,

    /// Alias to query, bypassing selection
    #[serde(default)]
    pub db_hint: Option<String>,

    /// Same as `db_hint`, consulted when it is absent
    #[serde(default)]
    pub schema_name: Option<String>,

    /// Candidates considered during selection
    #[serde(default)]
    pub max_tables: Option<usize>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_db_hint(mut self, hint: impl Into<String>) -> Self {
        self.db_hint = Some(hint.into());
        self
    }

    /// Explicit alias, `db_hint` before `schema_name`; blank values are ignored
    pub fn hint(&self) -> Option<&str> {
        [self.db_hint.as_deref(), self.schema_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|h| !h.trim().is_empty())
    }
}

/// Answer, executed SQL and trace of one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Alias the agent targeted
    pub db: String,

    pub answer: String,

    /// Executed SQL or `"SQL query not found"`
    pub sql_query: String,

    pub intermediate_steps: Vec<AgentStep>,
}

/// Liveness of the attached databases and the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub databases: Vec<String>,
    pub total_tables: usize,
    pub available_tables: Vec<String>,
}

/// Composes registry, selector and agent factory
pub struct QueryGateway {
    registry: Arc<ConnectionRegistry>,
    introspector: SchemaIntrospector,
    selector: Arc<SemanticSelector>,
    factory: AgentFactory,
    default_alias: String,
    schemas: DashMap<String, Arc<PrecomputedSchema>>,
}

impl QueryGateway {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        introspector: SchemaIntrospector,
        selector: Arc<SemanticSelector>,
        factory: AgentFactory,
        default_alias: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            introspector,
            selector,
            factory,
            default_alias: default_alias.into(),
            schemas: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn selector(&self) -> &Arc<SemanticSelector> {
        &self.selector
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    /// Connect and index every table name of the configured databases
    pub async fn warm_up(&self) -> Result<usize> {
        let handle = self.registry.get_connection().await?;
        let indexed = self
            .selector
            .index(handle.pool(), handle.aliases())
            .await?;
        info!("Selector ready with {} table(s)", indexed);
        Ok(indexed)
    }

    /// Pick the alias a question targets
    ///
    /// An explicit hint is used verbatim. Otherwise the owner of the most
    /// similar table wins, and the default alias covers an empty index or a
    /// failed lookup.
    pub async fn resolve_alias(&self, request: &QueryRequest) -> String {
        if let Some(hint) = request.hint() {
            debug!("Using hinted database {}", hint);
            return hint.to_string();
        }

        let top_k = request.max_tables.unwrap_or(DEFAULT_TOP_K).max(1);
        match self.selector.select(&request.question, top_k).await {
            Ok(matches) => match matches.into_iter().next() {
                Some(best) => {
                    debug!(
                        "Selected {} (distance {:.4})",
                        best.qualified_name, best.distance
                    );
                    best.metadata.db
                }
                None => self.default_alias.clone(),
            },
            Err(e) => {
                warn!("Database selection failed, using {}: {}", self.default_alias, e);
                self.default_alias.clone()
            }
        }
    }

    /// Schema description of one alias, cached after first use
    ///
    /// Aliases that are not attached get the description of every attached
    /// database, cached once under [`FULL_SCHEMA_KEY`].
    pub async fn schema_for(&self, alias: &str) -> Result<Arc<PrecomputedSchema>> {
        let handle = self.registry.get_connection().await?;
        let attached = handle.has_alias(alias);
        if !attached {
            warn!(
                "Database '{}' is not attached, describing all databases",
                alias
            );
        }

        let key = if attached { alias } else { FULL_SCHEMA_KEY };
        if let Some(cached) = self.schemas.get(key) {
            return Ok(cached.clone());
        }

        let description = if attached {
            self.introspector
                .describe_database(handle.pool(), alias)
                .await?
        } else {
            self.introspector.describe_schema(handle.pool()).await?
        };

        let schema = Arc::new(PrecomputedSchema::new(description));
        self.schemas.insert(key.to_string(), schema.clone());
        Ok(schema)
    }

    /// Number of cached schema descriptions
    pub fn cached_schemas(&self) -> usize {
        self.schemas.len()
    }

    /// Answer a question
    pub async fn ask(&self, request: &QueryRequest) -> Result<QueryResponse> {
        if request.question.trim().is_empty() {
            return Err(RuntimeError::InvalidOperation(
                "Question must not be empty".to_string(),
            ));
        }

        self.factory.check_credentials()?;

        let alias = self.resolve_alias(request).await;
        let schema = self.schema_for(&alias).await?;
        let agent = self.factory.build_agent(schema, &alias).await?;
        let output = agent.run(&request.question).await?;

        let sql_query = executed_sql(&output);
        info!("Answered question on {}: {}", alias, sql_query);

        Ok(QueryResponse {
            db: alias,
            answer: output.output,
            sql_query,
            intermediate_steps: output.intermediate_steps,
        })
    }

    /// Check files and aliases, and report the indexed tables
    pub async fn health(&self) -> Result<HealthReport> {
        let databases = self.registry.health_check().await?;
        let available_tables = self.selector.tables().await;
        Ok(HealthReport {
            databases,
            total_tables: available_tables.len(),
            available_tables,
        })
    }

    /// Every indexed table
    pub async fn tables(&self) -> Vec<String> {
        self.selector.tables().await
    }

    /// Tables most similar to free text
    pub async fn search_tables(&self, query: &str, max_results: usize) -> Result<Vec<TableMatch>> {
        self.selector.select(query, max_results).await
    }
}

/// Structured report first, then trace scraping, then the sentinel
fn executed_sql(output: &AgentOutput) -> String {
    match output.executed_sql() {
        Some(sql) if sql.ends_with(';') => sql,
        Some(sql) => format!("{};", sql),
        None => extract_sql(&output.intermediate_steps).unwrap_or_else(|| SQL_NOT_FOUND.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlsage_llm::{AgentAction, QUERY_TOOL_NAME};

    #[test]
    fn test_hint_precedence() {
        let mut request = QueryRequest::new("q");
        assert_eq!(request.hint(), None);

        request.schema_name = Some("blinkit".to_string());
        assert_eq!(request.hint(), Some("blinkit"));

        request.db_hint = Some("instamart".to_string());
        assert_eq!(request.hint(), Some("instamart"));

        request.db_hint = Some("  ".to_string());
        assert_eq!(request.hint(), Some("blinkit"));
    }

    #[test]
    fn test_request_deserializes_with_optional_fields() {
        let request: QueryRequest =
            serde_json::from_value(json!({"question": "How many orders?"})).unwrap();
        assert_eq!(request, QueryRequest::new("How many orders?"));
    }

    #[test]
    fn test_executed_sql_preference() {
        let steps = vec![
            AgentStep::new(
                AgentAction::new(
                    "sql_db_query_checker",
                    json!({"query": "SELECT name FROM zepto.products"}),
                    "",
                ),
                "SELECT name FROM zepto.products",
            ),
            AgentStep::new(
                AgentAction::new(
                    QUERY_TOOL_NAME,
                    json!({"query": "SELECT name FROM zepto.products LIMIT 10"}),
                    "",
                ),
                "[]",
            ),
        ];
        let output = AgentOutput {
            output: "none".to_string(),
            intermediate_steps: steps,
        };
        assert_eq!(
            executed_sql(&output),
            "SELECT name FROM zepto.products LIMIT 10;"
        );

        let empty = AgentOutput::default();
        assert_eq!(executed_sql(&empty), SQL_NOT_FOUND);
    }

    #[test]
    fn test_executed_sql_falls_back_to_trace_text() {
        let output = AgentOutput {
            output: String::new(),
            intermediate_steps: vec![AgentStep::new(
                AgentAction::new(
                    QUERY_TOOL_NAME,
                    json!({"query": "SELECT * FROM nope"}),
                    "",
                ),
                "Error: no such table",
            )],
        };
        // The failed statement is still the best display candidate
        assert_eq!(executed_sql(&output), "SELECT * FROM nope;");
    }
}
