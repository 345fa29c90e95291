//! Selector, toolkit and the question-answering cycle with scripted models

mod common;

use async_trait::async_trait;
use common::{registry_config, store_dir};
use serde_json::{json, Value};
use sqlsage_llm::{
    EmbeddingClient, HashingEmbeddings, LLMError, LLMResponse, MockProvider, Tool, ToolCall,
    QUERY_TOOL_NAME, SQL_NOT_FOUND,
};
use sqlsage_runtime::toolkit::{QuerySqlTool, SqlToolkit};
use sqlsage_runtime::{
    AgentFactory, AgentSettings, ConnectionRegistry, LlmCredentials, PrecomputedSchema,
    QueryGateway, QueryRequest, SchemaIntrospector, SemanticSelector,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Embedder that counts calls and fails them
#[derive(Default)]
struct CountingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingClient for CountingEmbedder {
    async fn embed_query(&self, _text: &str) -> sqlsage_llm::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LLMError::ApiCallFailed("offline".to_string()))
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn tool_call(name: &str, arguments: Value) -> LLMResponse {
    LLMResponse::new(String::new(), "mock".to_string()).with_tool_calls(vec![ToolCall::new(
        "call_1",
        name,
        arguments.to_string(),
    )])
}

fn answer(text: &str) -> LLMResponse {
    LLMResponse::new(text.to_string(), "mock".to_string())
}

struct Harness {
    _dir: TempDir,
    registry: Arc<ConnectionRegistry>,
    gateway: QueryGateway,
}

async fn harness(llm: Option<Arc<MockProvider>>, warm: bool) -> Harness {
    let dir = store_dir().await;
    let registry = Arc::new(ConnectionRegistry::new(registry_config(dir.path())));
    let selector = Arc::new(SemanticSelector::new(Arc::new(HashingEmbeddings::default())));

    let mut factory = AgentFactory::new(
        AgentSettings::default(),
        LlmCredentials::default(),
        registry.clone(),
    );
    if let Some(llm) = llm {
        factory = factory.with_llm(llm);
    }

    let gateway = QueryGateway::new(
        registry.clone(),
        SchemaIntrospector::default(),
        selector,
        factory,
        "zepto",
    );
    if warm {
        gateway.warm_up().await.unwrap();
    }

    Harness {
        _dir: dir,
        registry,
        gateway,
    }
}

// ========== Selector Tests ==========

#[tokio::test]
async fn test_index_and_self_match() {
    let h = harness(None, true).await;
    let selector = h.gateway.selector();

    assert_eq!(selector.index_ref().len().await, 5);

    let matches = selector.select("customers", 3).await.unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].qualified_name, "blinkit.customers");
    assert_eq!(matches[0].metadata.db, "blinkit");
    assert!(matches[0].distance < 1e-4);

    assert_eq!(
        selector.select_database("deliveries").await.unwrap().as_deref(),
        Some("instamart")
    );
}

#[tokio::test]
async fn test_reindex_is_idempotent() {
    let h = harness(None, true).await;
    let before = h.gateway.tables().await;

    assert_eq!(h.gateway.warm_up().await.unwrap(), 5);
    assert_eq!(h.gateway.tables().await, before);
}

#[tokio::test]
async fn test_empty_index_does_not_embed() {
    let embedder = Arc::new(CountingEmbedder::default());
    let selector = SemanticSelector::new(embedder.clone());

    assert!(selector.select("anything", 3).await.unwrap().is_empty());
    assert_eq!(selector.select_database("anything").await.unwrap(), None);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

// ========== Toolkit Tests ==========

#[tokio::test]
async fn test_query_tool_returns_json_rows() {
    let h = harness(None, false).await;
    let handle = h.registry.get_connection().await.unwrap();
    let tool = QuerySqlTool::new(handle, 2);

    let out = tool
        .call(json!({"query": "SELECT name, price FROM zepto.products ORDER BY id"}))
        .await
        .unwrap();
    let rows: Vec<Value> = serde_json::from_str(&out).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], json!({"name": "Milk", "price": 2.5}));
}

#[tokio::test]
async fn test_query_tool_rejects_writes_and_reports_errors() {
    let h = harness(None, false).await;
    let handle = h.registry.get_connection().await.unwrap();
    let tool = QuerySqlTool::new(handle, 10);

    assert!(tool
        .call(json!({"query": "DROP TABLE zepto.products"}))
        .await
        .is_err());
    let err = tool
        .call(json!({"query": "SELECT * FROM zepto.nope"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no such table"));
}

#[tokio::test]
async fn test_query_tool_cannot_lift_read_only() {
    let dir = store_dir().await;
    let registry = ConnectionRegistry::new(registry_config(dir.path()).with_pool_size(1));
    let handle = registry.get_connection().await.unwrap();
    let tool = QuerySqlTool::new(handle, 10);

    assert!(tool
        .call(json!({"query": "PRAGMA query_only = OFF"}))
        .await
        .is_err());
    assert!(tool
        .call(json!({"query": "WITH t AS (SELECT 1) DELETE FROM zepto.products"}))
        .await
        .is_err());

    let out = tool
        .call(json!({"query": "SELECT COUNT(*) AS n FROM zepto.products"}))
        .await
        .unwrap();
    assert_eq!(out, r#"[{"n":4}]"#);
}

#[tokio::test]
async fn test_query_tool_stops_reading_at_row_cap() {
    let h = harness(None, false).await;
    let handle = h.registry.get_connection().await.unwrap();
    let tool = QuerySqlTool::new(handle, 2);

    // Unbounded recursive CTE; only a streamed read terminates
    let call = tool.call(json!({
        "query": "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) SELECT x FROM c"
    }));
    let out = tokio::time::timeout(std::time::Duration::from_secs(10), call)
        .await
        .expect("row cap did not bound the read")
        .unwrap();

    assert_eq!(out, r#"[{"x":1},{"x":2}]"#);
}

#[tokio::test]
async fn test_toolkit_tool_names() {
    let h = harness(None, false).await;
    let handle = h.registry.get_connection().await.unwrap();
    let toolkit = SqlToolkit::new(
        handle,
        Arc::new(PrecomputedSchema::new(Default::default())),
        Arc::new(MockProvider::new()),
        "mock",
        10,
    );

    let names: Vec<String> = toolkit.tools().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(
        names,
        vec![
            QUERY_TOOL_NAME,
            "sql_db_schema",
            "sql_db_list_tables",
            "sql_db_query_checker"
        ]
    );
}

// ========== Gateway Tests ==========

#[tokio::test]
async fn test_ask_runs_agent_and_reports_sql() {
    let llm = Arc::new(MockProvider::with_script(vec![
        tool_call("sql_db_list_tables", json!({})),
        tool_call(
            QUERY_TOOL_NAME,
            json!({"query": "SELECT COUNT(*) AS n FROM zepto.products"}),
        ),
        answer("There are 4 products."),
    ]));
    let h = harness(Some(llm.clone()), true).await;

    let response = h
        .gateway
        .ask(&QueryRequest::new("How many products?").with_db_hint("zepto"))
        .await
        .unwrap();

    assert_eq!(response.db, "zepto");
    assert_eq!(response.answer, "There are 4 products.");
    assert_eq!(response.sql_query, "SELECT COUNT(*) AS n FROM zepto.products;");
    assert_eq!(response.intermediate_steps.len(), 2);
    assert_eq!(
        response.intermediate_steps[0].observation,
        "zepto.orders, zepto.products"
    );
    assert_eq!(response.intermediate_steps[1].observation, r#"[{"n":4}]"#);

    // The system prompt names the target database
    let first = &llm.requests()[0];
    assert!(first.messages[0]
        .content
        .as_deref()
        .unwrap_or_default()
        .contains("'zepto'"));
}

#[tokio::test]
async fn test_hint_bypasses_selection() {
    let llm = Arc::new(MockProvider::with_script(vec![answer("ok")]));
    let h = harness(Some(llm), true).await;

    // "customers" alone would select blinkit
    let response = h
        .gateway
        .ask(&QueryRequest::new("customers").with_db_hint("instamart"))
        .await
        .unwrap();
    assert_eq!(response.db, "instamart");
    assert_eq!(response.sql_query, SQL_NOT_FOUND);
}

#[tokio::test]
async fn test_selection_without_hint() {
    let llm = Arc::new(MockProvider::with_script(vec![answer("ok")]));
    let h = harness(Some(llm), true).await;

    let response = h.gateway.ask(&QueryRequest::new("customers")).await.unwrap();
    assert_eq!(response.db, "blinkit");
}

#[tokio::test]
async fn test_empty_index_falls_back_to_default() {
    let llm = Arc::new(MockProvider::with_script(vec![answer("ok")]));
    let h = harness(Some(llm), false).await;

    let request = QueryRequest::new("customers");
    assert_eq!(h.gateway.resolve_alias(&request).await, "zepto");
    assert_eq!(h.gateway.ask(&request).await.unwrap().db, "zepto");
}

#[tokio::test]
async fn test_unknown_hint_gets_full_schema() {
    let h = harness(None, false).await;

    let schema = h.gateway.schema_for("bigbasket").await.unwrap();
    assert_eq!(schema.schema().table_names.len(), 5);

    let zepto = h.gateway.schema_for("zepto").await.unwrap();
    assert_eq!(zepto.schema().table_names, vec!["zepto.orders", "zepto.products"]);
    assert!(Arc::ptr_eq(&zepto, &h.gateway.schema_for("zepto").await.unwrap()));
}

#[tokio::test]
async fn test_unknown_hints_share_one_cache_entry() {
    let h = harness(None, false).await;

    let first = h.gateway.schema_for("bogus_1").await.unwrap();
    for i in 2..50 {
        let other = h.gateway.schema_for(&format!("bogus_{i}")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &other));
    }
    assert_eq!(h.gateway.cached_schemas(), 1);

    h.gateway.schema_for("blinkit").await.unwrap();
    assert_eq!(h.gateway.cached_schemas(), 2);
}

#[tokio::test]
async fn test_missing_credentials_is_configuration_error() {
    let h = harness(None, true).await;

    let err = h
        .gateway
        .ask(&QueryRequest::new("How many products?"))
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn test_health_and_search() {
    let h = harness(None, true).await;

    let report = h.gateway.health().await.unwrap();
    assert_eq!(report.databases, vec!["zepto", "blinkit", "instamart"]);
    assert_eq!(report.total_tables, 5);
    assert!(report
        .available_tables
        .contains(&"instamart.deliveries".to_string()));

    let hits = h.gateway.search_tables("products", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|m| m.metadata.table == "products"));
}
