//! Mock LLM provider for testing

use crate::client::{LLMClient, LLMRequest, LLMResponse};
use crate::error::Result;
use crate::provider::LLMProvider;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock LLM provider for testing
///
/// Replays a script of responses in order; once the script is exhausted every
/// call answers with the default response. Requests are recorded so tests can
/// inspect what the agent sent.
pub struct MockProvider {
    name: String,
    default_response: String,
    script: Mutex<VecDeque<LLMResponse>>,
    requests: Mutex<Vec<LLMRequest>>,
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self::with_response("Mock LLM response".to_string())
    }

    /// Create with custom default response
    pub fn with_response(response: String) -> Self {
        Self {
            name: "mock".to_string(),
            default_response: response,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create with a scripted sequence of responses
    pub fn with_script(script: Vec<LLMResponse>) -> Self {
        let provider = Self::new();
        *provider.script.lock().unwrap_or_else(|e| e.into_inner()) = script.into();
        provider
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockProvider {
    async fn call(&self, request: LLMRequest) -> Result<LLMResponse> {
        let model = request.model.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        Ok(scripted.unwrap_or_else(|| {
            LLMResponse::new(self.default_response.clone(), model)
                .with_tokens(10)
                .with_finish_reason("stop".to_string())
        }))
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl LLMProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ToolCall;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockProvider::new();
        let request = LLMRequest::from_prompt("Test".to_string(), "mock-model".to_string());

        let response = provider.call(request).await.unwrap();
        assert_eq!(response.content, "Mock LLM response");
        assert_eq!(response.model, "mock-model");
        assert!(provider.supports_tools());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_replays_script() {
        let provider = MockProvider::with_script(vec![
            LLMResponse::new(String::new(), "m".to_string())
                .with_tool_calls(vec![ToolCall::new("c1", "sql_db_list_tables", "{}")]),
            LLMResponse::new("done".to_string(), "m".to_string()),
        ]);

        let first = provider
            .call(LLMRequest::from_prompt("q".to_string(), "m".to_string()))
            .await
            .unwrap();
        let second = provider
            .call(LLMRequest::from_prompt("q".to_string(), "m".to_string()))
            .await
            .unwrap();
        let third = provider
            .call(LLMRequest::from_prompt("q".to_string(), "m".to_string()))
            .await
            .unwrap();

        assert!(first.has_tool_calls());
        assert_eq!(second.content, "done");
        assert_eq!(third.content, "Mock LLM response");
        assert_eq!(provider.requests().len(), 3);
    }
}
