//! SQL tools exposed to the agent

use super::schema_provider::SchemaProvider;
use crate::database::value::row_object;
use crate::database::AttachedPool;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::{json, Value};
use sqlsage_llm::agent::string_arg;
use sqlsage_llm::{LLMClient, LLMError, LLMRequest, Result, Tool, QUERY_TOOL_NAME};
use std::sync::Arc;
use tracing::debug;

pub const SCHEMA_TOOL_NAME: &str = "sql_db_schema";
pub const LIST_TABLES_TOOL_NAME: &str = "sql_db_list_tables";
pub const QUERY_CHECKER_TOOL_NAME: &str = "sql_db_query_checker";

/// Statements `sql_db_query` accepts
const READ_ONLY_KEYWORDS: [&str; 4] = ["SELECT", "WITH", "PRAGMA", "EXPLAIN"];

/// Pragmas that only report schema information
const SCHEMA_PRAGMAS: [&str; 8] = [
    "TABLE_INFO",
    "TABLE_XINFO",
    "TABLE_LIST",
    "INDEX_LIST",
    "INDEX_INFO",
    "INDEX_XINFO",
    "FOREIGN_KEY_LIST",
    "DATABASE_LIST",
];

/// Verbs that can follow a CTE list
const STATEMENT_VERBS: [&str; 6] = ["SELECT", "VALUES", "INSERT", "UPDATE", "DELETE", "REPLACE"];

fn query_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "A detailed and correct SQL query."}
        },
        "required": ["query"]
    })
}

/// Executes read-only SQL against the shared pool
pub struct QuerySqlTool {
    handle: Arc<AttachedPool>,
    max_rows: usize,
}

impl QuerySqlTool {
    pub fn new(handle: Arc<AttachedPool>, max_rows: usize) -> Self {
        Self { handle, max_rows }
    }
}

#[async_trait]
impl Tool for QuerySqlTool {
    fn name(&self) -> &str {
        QUERY_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute a SQL query against the database and get back the result as a JSON array of rows. \
         Qualify every table as alias.table. If the query is not correct, an error message will be \
         returned; rewrite the query, check it, and try again. If you encounter an issue with an \
         unknown column, use sql_db_schema to query the correct table fields."
    }

    fn parameters(&self) -> Value {
        query_parameters()
    }

    async fn call(&self, input: Value) -> Result<String> {
        let query = string_arg(&input, "query")
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| LLMError::tool(QUERY_TOOL_NAME, "missing 'query' argument"))?;

        check_read_only(&query).map_err(|msg| LLMError::tool(QUERY_TOOL_NAME, msg))?;

        debug!("Executing agent SQL: {}", query);
        let mut rows = sqlx::query(&query).fetch(self.handle.pool());
        let mut rendered: Vec<Value> = Vec::new();
        while rendered.len() < self.max_rows {
            match rows
                .try_next()
                .await
                .map_err(|e| LLMError::tool(QUERY_TOOL_NAME, e.to_string()))?
            {
                Some(row) => rendered.push(Value::Object(row_object(&row))),
                None => break,
            }
        }

        if rendered.len() == self.max_rows {
            debug!("Stopped reading rows at {}", self.max_rows);
        }
        Ok(serde_json::to_string(&rendered)?)
    }
}

/// Refuse anything but a single read-only statement
pub fn check_read_only(sql: &str) -> std::result::Result<(), String> {
    let body = strip_leading_comments(sql);
    let body = body.trim_end().trim_end_matches(';');

    if has_statement_separator(body) {
        return Err("Only a single statement may be executed".to_string());
    }

    let tokens = top_level_tokens(body);
    let keyword = tokens.first().map(String::as_str).unwrap_or_default();

    match keyword {
        "SELECT" | "EXPLAIN" => Ok(()),
        "WITH" => check_cte_verb(&tokens),
        "PRAGMA" => check_pragma(&tokens),
        _ => Err(format!(
            "Only read-only statements ({}) are allowed",
            READ_ONLY_KEYWORDS.join(", ")
        )),
    }
}

/// The statement after a CTE list must be a query
fn check_cte_verb(tokens: &[String]) -> std::result::Result<(), String> {
    match tokens
        .iter()
        .skip(1)
        .find(|t| STATEMENT_VERBS.contains(&t.as_str()))
        .map(String::as_str)
    {
        Some("SELECT") | Some("VALUES") => Ok(()),
        Some(verb) => Err(format!("{} statements are not allowed", verb)),
        None => Err("WITH must be followed by a SELECT".to_string()),
    }
}

/// Only schema-reporting pragmas, never assignments
fn check_pragma(tokens: &[String]) -> std::result::Result<(), String> {
    if tokens.iter().any(|t| t == "=") {
        return Err("PRAGMA assignments are not allowed".to_string());
    }
    let name = tokens
        .iter()
        .skip(1)
        .take_while(|t| t.as_str() != "(")
        .filter(|t| t.as_str() != ".")
        .last()
        .map(String::as_str)
        .unwrap_or_default();

    if SCHEMA_PRAGMAS.contains(&name) {
        Ok(())
    } else {
        Err(format!(
            "Only schema pragmas ({}) are allowed",
            SCHEMA_PRAGMAS.join(", ").to_ascii_lowercase()
        ))
    }
}

/// Uppercased words and `( . , =` symbols outside quotes, comments and
/// parentheses; an opening parenthesis at depth zero is kept as `(`
fn top_level_tokens(sql: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut depth = 0usize;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if depth == 0 {
                word.push(c.to_ascii_uppercase());
            }
            continue;
        }
        if !word.is_empty() {
            tokens.push(std::mem::take(&mut word));
        }

        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                for q in chars.by_ref() {
                    if q == close {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for q in chars.by_ref() {
                    if q == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for q in chars.by_ref() {
                    if prev == '*' && q == '/' {
                        break;
                    }
                    prev = q;
                }
            }
            '(' => {
                if depth == 0 {
                    tokens.push("(".to_string());
                }
                depth += 1;
            }
            ')' => depth = depth.saturating_sub(1),
            '.' | ',' | '=' if depth == 0 => tokens.push(c.to_string()),
            _ => {}
        }
    }
    if !word.is_empty() {
        tokens.push(word);
    }
    tokens
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(line) = rest.strip_prefix("--") {
            rest = line.split_once('\n').map_or("", |(_, after)| after).trim_start();
        } else if let Some(block) = rest.strip_prefix("/*") {
            rest = block.split_once("*/").map_or("", |(_, after)| after).trim_start();
        } else {
            return rest;
        }
    }
}

/// Whether a `;` appears outside quoted text
fn has_statement_separator(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if matches!(c, '\'' | '"' | '`') => quote = Some(c),
            None if c == ';' => return true,
            None => {}
        }
    }
    false
}

/// Returns schema text for a comma separated list of tables
pub struct InfoSqlTool {
    schema: Arc<dyn SchemaProvider>,
}

impl InfoSqlTool {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Tool for InfoSqlTool {
    fn name(&self) -> &str {
        SCHEMA_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get the schema and sample rows for the specified SQL tables. Input is a comma-separated \
         list of tables. Be sure the tables exist by calling sql_db_list_tables first!"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "A comma-separated list of the table names, e.g. zepto.products, zepto.orders"
                }
            },
            "required": ["table_names"]
        })
    }

    async fn call(&self, input: Value) -> Result<String> {
        let requested: Vec<String> = string_arg(&input, "table_names")
            .unwrap_or_default()
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();

        if requested.is_empty() {
            Ok(self.schema.describe(None))
        } else {
            Ok(self.schema.describe(Some(&requested)))
        }
    }
}

/// Lists the usable tables
pub struct ListTablesTool {
    schema: Arc<dyn SchemaProvider>,
}

impl ListTablesTool {
    pub fn new(schema: Arc<dyn SchemaProvider>) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        LIST_TABLES_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _input: Value) -> Result<String> {
        Ok(self.schema.list_tables().join(", "))
    }
}

/// Asks the model to double-check a query before it is executed
pub struct QueryCheckerTool {
    llm: Arc<dyn LLMClient>,
    model: String,
}

impl QueryCheckerTool {
    pub fn new(llm: Arc<dyn LLMClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    fn prompt(query: &str) -> String {
        format!(
            "{}\n\nDouble check the SQLite query above for common mistakes, including:\n\
             - Using NOT IN with NULL values\n\
             - Using UNION when UNION ALL should have been used\n\
             - Using BETWEEN for exclusive ranges\n\
             - Data type mismatch in predicates\n\
             - Properly quoting identifiers\n\
             - Using the correct number of arguments for functions\n\
             - Casting to the correct data type\n\
             - Using the proper columns for joins\n\
             - Missing the alias prefix on attached tables\n\n\
             If there are any of the above mistakes, rewrite the query. If there are no mistakes, \
             just reproduce the original query.\n\n\
             Output the final SQL query only.",
            query
        )
    }
}

#[async_trait]
impl Tool for QueryCheckerTool {
    fn name(&self) -> &str {
        QUERY_CHECKER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Use this tool to double check if your query is correct before executing it. \
         Always use this tool before executing a query with sql_db_query!"
    }

    fn parameters(&self) -> Value {
        query_parameters()
    }

    async fn call(&self, input: Value) -> Result<String> {
        let query = string_arg(&input, "query")
            .ok_or_else(|| LLMError::tool(QUERY_CHECKER_TOOL_NAME, "missing 'query' argument"))?;

        let request = LLMRequest::from_prompt(Self::prompt(&query), self.model.clone())
            .with_temperature(0.0);
        let response = self.llm.call(request).await?;
        Ok(response.content.trim().to_string())
    }
}
