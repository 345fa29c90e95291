//! Construction of the SQL agent
//!
//! One agent per request: the schema it sees is scoped to the resolved alias,
//! the pool and model client are shared.

use crate::database::ConnectionRegistry;
use crate::error::{Result, RuntimeError};
use crate::toolkit::{SchemaProvider, SqlToolkit};
use serde::{Deserialize, Serialize};
use sqlsage_llm::{
    AgentConfig, AgentExecutor, AgentOutput, LLMClient, OpenAIProvider, DEFAULT_OPENAI_BASE_URL,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Placeholder shipped in sample `.env` files
pub const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

/// Model and loop limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f32,
    pub max_iterations: usize,

    /// Row limit suggested to the model
    pub top_k: usize,

    /// Rows returned by one query tool call
    pub max_rows: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            max_iterations: 15,
            top_k: 10,
            max_rows: 100,
        }
    }
}

/// OpenAI-compatible endpoint credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LlmCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl LlmCredentials {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// The API key, rejecting missing, blank and placeholder values
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(RuntimeError::Configuration(
                "OpenAI API key not found. Please set OPENAI_API_KEY environment variable. \
                 You can get an API key from https://platform.openai.com/api-keys"
                    .to_string(),
            )),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL)
    }
}

/// Builds [`SqlAgent`]s
pub struct AgentFactory {
    settings: AgentSettings,
    credentials: LlmCredentials,
    registry: Arc<ConnectionRegistry>,
    llm: Option<Arc<dyn LLMClient>>,
}

impl AgentFactory {
    pub fn new(
        settings: AgentSettings,
        credentials: LlmCredentials,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            settings,
            credentials,
            registry,
            llm: None,
        }
    }

    /// Use this client instead of building one from credentials
    pub fn with_llm(mut self, llm: Arc<dyn LLMClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Fail early when no model client can be built
    pub fn check_credentials(&self) -> Result<()> {
        if self.llm.is_none() {
            self.credentials.require_api_key()?;
        }
        Ok(())
    }

    fn llm_client(&self) -> Result<Arc<dyn LLMClient>> {
        if let Some(llm) = &self.llm {
            return Ok(llm.clone());
        }
        let key = self.credentials.require_api_key()?;
        Ok(Arc::new(OpenAIProvider::with_base_url(
            key.to_string(),
            self.credentials.base_url().to_string(),
        )))
    }

    /// Bind model, SQL toolkit and prompt for one target database
    pub async fn build_agent(
        &self,
        schema: Arc<dyn SchemaProvider>,
        alias: &str,
    ) -> Result<SqlAgent> {
        let llm = self.llm_client()?;
        let handle = self.registry.get_connection().await?;

        let toolkit = SqlToolkit::new(
            handle,
            schema,
            llm.clone(),
            self.settings.model.clone(),
            self.settings.max_rows,
        );
        let tools = toolkit.tools();
        debug!(
            "Building agent for {} with {} table(s)",
            alias,
            toolkit.schema().list_tables().len()
        );

        let config = AgentConfig::new(self.settings.model.clone())
            .with_temperature(self.settings.temperature)
            .with_max_iterations(self.settings.max_iterations)
            .with_system_prompt(system_prompt(alias, self.settings.top_k));

        Ok(SqlAgent {
            alias: alias.to_string(),
            executor: AgentExecutor::new(llm, tools, config),
        })
    }
}

/// System prompt for the SQL agent
pub fn system_prompt(alias: &str, top_k: usize) -> String {
    format!(
        "You are an agent designed to interact with a SQL database.\n\
         Given an input question, create a syntactically correct SQLite query to run, then look at \
         the results of the query and return the answer.\n\
         Unless the user specifies a specific number of examples they wish to obtain, always limit \
         your query to at most {top_k} results.\n\
         You can order the results by a relevant column to return the most interesting examples in \
         the database.\n\
         Never query for all the columns from a specific table, only ask for the relevant columns \
         given the question.\n\
         Tables live in attached databases and must be referenced as alias.table. The question \
         most likely concerns the '{alias}' database.\n\
         You have access to tools for interacting with the database. Only use the given tools and \
         only use the information returned by the tools to construct your final answer.\n\
         You MUST double check your query before executing it. If you get an error while executing \
         a query, rewrite the query and try again.\n\
         DO NOT make any DML statements (INSERT, UPDATE, DELETE, DROP etc.) to the database.\n\
         To start you should ALWAYS look at the tables in the database to see what you can query. \
         Do NOT skip this step.\n\
         Then you should query the schema of the most relevant tables."
    )
}

/// An agent bound to one target database
pub struct SqlAgent {
    alias: String,
    executor: AgentExecutor,
}

impl SqlAgent {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }

    /// Answer a question, returning the answer and the tool trace
    pub async fn run(&self, question: &str) -> Result<AgentOutput> {
        info!("Running SQL agent on {}", self.alias);
        Ok(self.executor.run(question).await?)
    }
}
