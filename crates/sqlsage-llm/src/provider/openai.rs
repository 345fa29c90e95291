//! OpenAI provider implementation (chat completions with function calling)

use crate::client::{ChatMessage, LLMClient, LLMRequest, LLMResponse, ToolCall};
use crate::error::{LLMError, Result};
use crate::provider::LLMProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Default OpenAI API endpoint
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider
pub struct OpenAIProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_OPENAI_BASE_URL.to_string())
    }

    /// Create with custom base URL (e.g., Azure OpenAI or a compatible local server)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

fn message_to_json(message: &ChatMessage) -> Value {
    let mut value = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });

    if !message.tool_calls.is_empty() {
        value["tool_calls"] = Value::Array(
            message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect(),
        );
    }

    if let Some(id) = &message.tool_call_id {
        value["tool_call_id"] = json!(id);
    }

    value
}

/// Build the chat completions request body
pub(crate) fn build_body(request: &LLMRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_json).collect();

    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }

    if !request.tools.is_empty() {
        body["tools"] = Value::Array(
            request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect(),
        );
    }

    body
}

/// Parse a chat completions response body
pub(crate) fn parse_response(resp_json: &Value, model: &str) -> Result<LLMResponse> {
    let message = &resp_json["choices"][0]["message"];
    if message.is_null() {
        return Err(LLMError::InvalidResponse(
            "No message in response".to_string(),
        ));
    }

    let tool_calls: Vec<ToolCall> = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let name = call["function"]["name"].as_str()?;
                    Some(ToolCall::new(
                        call["id"].as_str().unwrap_or_default(),
                        name,
                        call["function"]["arguments"].as_str().unwrap_or("{}"),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    let content = match message["content"].as_str() {
        Some(text) => text.to_string(),
        None if !tool_calls.is_empty() => String::new(),
        None => {
            return Err(LLMError::InvalidResponse(
                "No content in response".to_string(),
            ))
        }
    };

    let finish_reason = resp_json["choices"][0]["finish_reason"]
        .as_str()
        .unwrap_or("stop")
        .to_string();

    let tokens_used = resp_json["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32;

    let model = resp_json["model"].as_str().unwrap_or(model).to_string();

    Ok(LLMResponse::new(content, model)
        .with_tokens(tokens_used)
        .with_tool_calls(tool_calls)
        .with_finish_reason(finish_reason))
}

#[async_trait]
impl LLMClient for OpenAIProvider {
    async fn call(&self, request: LLMRequest) -> Result<LLMResponse> {
        let body = build_body(&request);

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling OpenAI chat completions"
        );

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::ApiCallFailed(format!("OpenAI API call failed: {}", e)))?;

        let status = resp.status();
        let resp_text = resp
            .text()
            .await
            .map_err(|e| LLMError::ApiCallFailed(format!("Failed to read response: {}", e)))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LLMError::InvalidConfiguration(format!(
                "OpenAI rejected the API key ({}): {}",
                status, resp_text
            )));
        }

        if !status.is_success() {
            return Err(LLMError::ApiCallFailed(format!(
                "OpenAI API error ({}): {}",
                status, resp_text
            )));
        }

        let resp_json: Value = serde_json::from_str(&resp_text).map_err(|e| {
            LLMError::ApiCallFailed(format!("Failed to parse response: {}", e))
        })?;

        parse_response(&resp_json, &request.model)
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "openai"
    }
}

impl LLMProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
