//! REST API type definitions
//!
//! Request and response types for the REST API endpoints.

use serde::{Deserialize, Serialize};
use sqlsage_llm::AgentStep;
use sqlsage_runtime::{HealthReport, QueryGateway, QueryRequest, QueryResponse, TableMatch, TableMetadata};
use std::sync::Arc;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<QueryGateway>,
}

/// `POST /ask-sql` body
#[derive(Debug, Clone, Deserialize)]
pub struct AskSqlRequest {
    pub question: String,

    /// Alias to query, bypassing selection
    #[serde(default)]
    pub db_hint: Option<String>,

    /// Alternative to `db_hint`
    #[serde(default)]
    pub schema_name: Option<String>,

    /// Candidates considered during selection
    #[serde(default)]
    pub max_tables: Option<usize>,
}

impl From<AskSqlRequest> for QueryRequest {
    fn from(payload: AskSqlRequest) -> Self {
        QueryRequest {
            question: payload.question,
            db_hint: payload.db_hint,
            schema_name: payload.schema_name,
            max_tables: payload.max_tables,
        }
    }
}

/// `POST /ask-sql` response
#[derive(Debug, Clone, Serialize)]
pub struct AskSqlResponse {
    pub db: String,
    pub answer: String,
    pub sql_query: String,
    pub intermediate_steps: Vec<AgentStep>,
}

impl From<QueryResponse> for AskSqlResponse {
    fn from(response: QueryResponse) -> Self {
        Self {
            db: response.db,
            answer: response.answer,
            sql_query: response.sql_query,
            intermediate_steps: response.intermediate_steps,
        }
    }
}

/// `GET /` response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub databases: Vec<String>,
    pub total_tables: usize,
    pub available_tables: Vec<String>,
}

impl From<HealthReport> for HealthResponse {
    fn from(report: HealthReport) -> Self {
        Self {
            status: "healthy".to_string(),
            databases: report.databases,
            total_tables: report.total_tables,
            available_tables: report.available_tables,
        }
    }
}

/// `GET /tables` response
#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
    pub count: usize,
}

/// `GET /tables/search` query string
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    5
}

/// `GET /tables/search` response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub relevant_tables: Vec<String>,
    pub metadata: Vec<TableMetadata>,
    pub count: usize,
}

impl SearchResponse {
    pub fn new(query: String, matches: Vec<TableMatch>) -> Self {
        let (relevant_tables, metadata): (Vec<_>, Vec<_>) = matches
            .into_iter()
            .map(|m| (m.qualified_name, m.metadata))
            .unzip();
        Self {
            query,
            count: relevant_tables.len(),
            relevant_tables,
            metadata,
        }
    }
}
