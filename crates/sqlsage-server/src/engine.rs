//! Gateway initialization
//!
//! Converts server configuration into the runtime components and wires them
//! into one [`QueryGateway`]. Nothing here touches the databases; the pool is
//! created on first use.

use crate::config::{EmbeddingProvider, ServerConfig};
use anyhow::Result;
use sqlsage_llm::{EmbeddingClient, HashingEmbeddings, LLMClient, OpenAIEmbeddings};
use sqlsage_runtime::{AgentFactory, ConnectionRegistry, QueryGateway, SemanticSelector};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the gateway from configuration
pub async fn init_gateway(config: &ServerConfig) -> Result<QueryGateway> {
    build_gateway(config, None)
}

/// Build the gateway, optionally with a preconfigured chat model
pub fn build_gateway(
    config: &ServerConfig,
    llm: Option<Arc<dyn LLMClient>>,
) -> Result<QueryGateway> {
    let registry_config = config.registry_config();
    registry_config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid database configuration: {}", e))?;
    let registry = Arc::new(ConnectionRegistry::new(registry_config));

    let selector = Arc::new(SemanticSelector::new(embedding_client(config)));

    let mut factory = AgentFactory::new(
        config.agent_settings(),
        config.llm_credentials(),
        registry.clone(),
    );
    if let Some(llm) = llm {
        factory = factory.with_llm(llm);
    }

    info!(
        "Gateway configured for {} database(s), default '{}'",
        config.databases.attached.len(),
        config.databases.default_alias
    );

    Ok(QueryGateway::new(
        registry,
        config.introspector(),
        selector,
        factory,
        config.databases.default_alias.clone(),
    ))
}

/// Embedding client for the selector
///
/// Without a usable key the OpenAI provider is replaced by the local
/// hashing embedder so selection keeps working.
pub fn embedding_client(config: &ServerConfig) -> Arc<dyn EmbeddingClient> {
    let hashing = || -> Arc<dyn EmbeddingClient> {
        Arc::new(HashingEmbeddings::new(config.embedding.dimension))
    };

    match config.embedding.provider {
        EmbeddingProvider::Hashing => hashing(),
        EmbeddingProvider::OpenAI => {
            let credentials = config.embedding_credentials();
            match credentials.require_api_key() {
                Ok(key) => {
                    let client = OpenAIEmbeddings::with_model(
                        key.to_string(),
                        config.embedding.model.clone(),
                    )
                    .with_base_url(credentials.base_url().to_string());
                    Arc::new(client)
                }
                Err(_) => {
                    warn!("No API key for OpenAI embeddings, using hashing embeddings");
                    hashing()
                }
            }
        }
    }
}
