//! Server configuration
//!
//! Sources, lowest precedence first: built-in defaults, the optional
//! `config/server` file, `SQLSAGE_*` environment variables (`__` separates
//! nested keys, e.g. `SQLSAGE_LLM__MODEL`), then the conventional
//! `OPENAI_*` variables.

use serde::{Deserialize, Serialize};
use sqlsage_llm::{DEFAULT_EMBEDDING_MODEL, DEFAULT_OPENAI_BASE_URL};
use sqlsage_runtime::{
    AgentSettings, AttachedDatabase, LlmCredentials, MainDatabasePolicy, RegistryConfig,
    SchemaIntrospector,
};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Attached databases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Directory relative database files are resolved against
    pub base_dir: PathBuf,

    /// Alias used when nothing else selects one
    pub default_alias: String,

    pub pool_size: u32,

    /// Sample rows shown per table in the schema description
    pub sample_rows: usize,

    pub main_policy: MainDatabasePolicy,

    pub attached: Vec<AttachedDatabase>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        let registry = RegistryConfig::default();
        Self {
            base_dir: registry.base_dir,
            default_alias: "zepto".to_string(),
            pool_size: registry.pool_size,
            sample_rows: 3,
            main_policy: MainDatabasePolicy::default(),
            attached: registry.databases,
        }
    }
}

/// Chat model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub top_k: usize,
    pub max_rows: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let agent = AgentSettings::default();
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: agent.model,
            temperature: agent.temperature,
            max_iterations: agent.max_iterations,
            top_k: agent.top_k,
            max_rows: agent.max_rows,
        }
    }
}

/// Embedding backend used by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAI,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,

    /// Vector length of the hashing embedder
    pub dimension: usize,

    /// Falls back to the chat model key when unset
    pub api_key: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: 256,
            api_key: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (HTTP)
    pub port: u16,

    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,

    pub log_format: LogFormat,

    pub databases: DatabaseSettings,

    pub llm: LlmSettings,

    pub embedding: EmbeddingSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            databases: DatabaseSettings::default(),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, the config file and the environment
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if exists
        dotenvy::dotenv().ok();

        let config_result = config::Config::builder()
            .add_source(config::File::with_name("config/server").required(false))
            .add_source(
                config::Environment::with_prefix("SQLSAGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build();

        let mut config: Self = match config_result {
            Ok(cfg) => cfg
                .try_deserialize()
                .map_err(|e| anyhow::anyhow!("Failed to deserialize config: {}", e))?,
            Err(e) => {
                tracing::info!("No usable config source ({}), using default configuration", e);
                Self::default()
            }
        };

        config.apply_openai_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_TEMPERATURE` and
    /// `OPENAI_BASE_URL` from the given lookup
    pub fn apply_openai_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(raw) = lookup("OPENAI_TEMPERATURE") {
            match raw.trim().parse::<f32>() {
                Ok(temperature) => self.llm.temperature = temperature,
                Err(_) => tracing::warn!("Ignoring invalid OPENAI_TEMPERATURE '{}'", raw),
            }
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
    }

    /// HTTP listen address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::new(
            self.databases.base_dir.clone(),
            self.databases.attached.clone(),
        )
        .with_pool_size(self.databases.pool_size)
    }

    pub fn introspector(&self) -> SchemaIntrospector {
        SchemaIntrospector::new(self.databases.sample_rows, self.databases.main_policy)
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_iterations: self.llm.max_iterations,
            top_k: self.llm.top_k,
            max_rows: self.llm.max_rows,
        }
    }

    pub fn llm_credentials(&self) -> LlmCredentials {
        LlmCredentials::new(self.llm.api_key.clone()).with_base_url(self.llm.base_url.clone())
    }

    /// Credentials for the embedding endpoint
    pub fn embedding_credentials(&self) -> LlmCredentials {
        let key = self
            .embedding
            .api_key
            .clone()
            .or_else(|| self.llm.api_key.clone());
        LlmCredentials::new(key).with_base_url(self.llm.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.databases.default_alias, "zepto");
        assert_eq!(config.databases.attached.len(), 3);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.embedding.provider, EmbeddingProvider::OpenAI);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_addr() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_registry_config_conversion() {
        let mut config = ServerConfig::default();
        config.databases.base_dir = PathBuf::from("/data");
        config.databases.pool_size = 2;

        let registry = config.registry_config();
        assert_eq!(registry.base_dir, PathBuf::from("/data"));
        assert_eq!(registry.pool_size, 2);
        assert_eq!(registry.aliases(), vec!["zepto", "blinkit", "instamart"]);
    }

    #[test]
    fn test_embedding_key_falls_back_to_llm_key() {
        let mut config = ServerConfig::default();
        config.llm.api_key = Some("sk-chat".to_string());
        assert_eq!(
            config.embedding_credentials().api_key.as_deref(),
            Some("sk-chat")
        );

        config.embedding.api_key = Some("sk-embed".to_string());
        assert_eq!(
            config.embedding_credentials().api_key.as_deref(),
            Some("sk-embed")
        );
    }
}
