//! Tool-calling agent loop
//!
//! The executor only relays: it sends the conversation and tool definitions to
//! the model, runs whatever tools the model asks for, and feeds the
//! observations back until the model answers or the iteration budget runs out.

use super::tool::Tool;
use super::trace::{AgentAction, AgentOutput, AgentStep, ERROR_OBSERVATION_PREFIX};
use crate::client::{ChatMessage, LLMClient, LLMRequest, ToolCall};
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output returned when the iteration budget is exhausted
pub const MAX_ITERATIONS_OUTPUT: &str = "Agent stopped due to max iterations.";

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model identifier
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum number of model calls per run
    pub max_iterations: usize,

    /// System prompt
    pub system_prompt: Option<String>,
}

impl AgentConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_iterations: 15,
            system_prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Tool-calling agent
pub struct AgentExecutor {
    llm: Arc<dyn LLMClient>,
    tools: Vec<Arc<dyn Tool>>,
    config: AgentConfig,
}

impl AgentExecutor {
    pub fn new(llm: Arc<dyn LLMClient>, tools: Vec<Arc<dyn Tool>>, config: AgentConfig) -> Self {
        Self { llm, tools, config }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Names of the tools available to the model
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Answer a question, recording every tool invocation
    pub async fn run(&self, input: &str) -> Result<AgentOutput> {
        let definitions: Vec<_> = self.tools.iter().map(|t| t.definition()).collect();
        let by_name: HashMap<&str, &Arc<dyn Tool>> =
            self.tools.iter().map(|t| (t.name(), t)).collect();

        let mut messages = Vec::new();
        if let Some(system) = &self.config.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(input));

        let mut steps = Vec::new();

        for iteration in 0..self.config.max_iterations {
            let request = LLMRequest::new(messages.clone(), self.config.model.clone())
                .with_temperature(self.config.temperature)
                .with_tools(definitions.clone());

            let response = self.llm.call(request).await?;

            if !response.has_tool_calls() {
                info!(
                    iterations = iteration + 1,
                    steps = steps.len(),
                    "Agent finished"
                );
                return Ok(AgentOutput {
                    output: response.content,
                    intermediate_steps: steps,
                });
            }

            let content = Some(response.content.clone()).filter(|c| !c.is_empty());
            messages.push(ChatMessage::assistant_tool_calls(
                content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let tool_input = parse_arguments(&call.arguments);
                let log = invocation_log(call, content.as_deref());
                debug!(tool = %call.name, arguments = %call.arguments, "Invoking tool");

                let observation = match by_name.get(call.name.as_str()) {
                    Some(tool) => match tool.call(tool_input.clone()).await {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "Tool call failed");
                            format!("{} {}", ERROR_OBSERVATION_PREFIX, e)
                        }
                    },
                    None => format!(
                        "{} {} is not a valid tool, try one of [{}].",
                        ERROR_OBSERVATION_PREFIX,
                        call.name,
                        self.tool_names().join(", ")
                    ),
                };

                messages.push(ChatMessage::tool(call.id.clone(), observation.clone()));
                steps.push(AgentStep::new(
                    AgentAction::new(call.name.clone(), tool_input, log),
                    observation,
                ));
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Agent stopped before producing an answer"
        );
        Ok(AgentOutput {
            output: MAX_ITERATIONS_OUTPUT.to_string(),
            intermediate_steps: steps,
        })
    }
}

fn parse_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}

fn invocation_log(call: &ToolCall, content: Option<&str>) -> String {
    match content {
        Some(text) => format!(
            "\nInvoking: `{}` with `{}`\nresponded: {}\n\n",
            call.name, call.arguments, text
        ),
        None => format!("\nInvoking: `{}` with `{}`\n\n\n", call.name, call.arguments),
    }
}
