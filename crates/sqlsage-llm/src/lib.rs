//! SQLSage LLM Integration
//!
//! This crate provides the model-facing half of the SQLSage gateway:
//! - Chat providers: OpenAI-compatible function calling, plus a scripted mock
//! - Embeddings: OpenAI embeddings and an offline hashing embedder
//! - Agent: a tool-calling loop that records every intermediate step
//! - Extraction: best-effort recovery of executed SQL from a trace
//!
//! Nothing here touches a database. The tools the agent calls are supplied
//! by the caller.

// Re-export core types
pub use client::{
    ChatMessage, LLMClient, LLMRequest, LLMResponse, Role, ToolCall, ToolDefinition,
};
pub use error::{LLMError, Result};

// Re-export providers
pub use provider::{LLMProvider, MockProvider, OpenAIProvider, DEFAULT_OPENAI_BASE_URL};

// Re-export embeddings
pub use embedding::{EmbeddingClient, HashingEmbeddings, OpenAIEmbeddings, DEFAULT_EMBEDDING_MODEL};

// Re-export agent
pub use agent::{
    AgentAction, AgentConfig, AgentExecutor, AgentOutput, AgentStep, Tool,
    MAX_ITERATIONS_OUTPUT, QUERY_TOOL_NAME,
};
pub use extractor::{extract_sql, extract_sql_or_sentinel, SQL_NOT_FOUND};

pub mod agent;
pub mod client;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod provider;
