//! Agent execution trace types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the tool that executes SQL
pub const QUERY_TOOL_NAME: &str = "sql_db_query";

/// Prefix of observations produced by failed tool calls
pub const ERROR_OBSERVATION_PREFIX: &str = "Error:";

/// One tool invocation decided by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Tool name
    pub tool: String,

    /// Parsed arguments (a JSON string when the model sent malformed JSON)
    pub tool_input: Value,

    /// Free-text log of the decision
    pub log: String,
}

impl AgentAction {
    pub fn new(tool: impl Into<String>, tool_input: Value, log: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input,
            log: log.into(),
        }
    }
}

/// An action paired with the tool's observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStep {
    pub action: AgentAction,
    pub observation: String,
}

impl AgentStep {
    pub fn new(action: AgentAction, observation: impl Into<String>) -> Self {
        Self {
            action,
            observation: observation.into(),
        }
    }

    /// Whether the tool reported a failure
    pub fn is_error(&self) -> bool {
        self.observation
            .trim_start()
            .starts_with(ERROR_OBSERVATION_PREFIX)
    }
}

/// Result of one agent run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Final natural-language answer
    pub output: String,

    /// Ordered tool invocations
    pub intermediate_steps: Vec<AgentStep>,
}

impl AgentOutput {
    /// Last statement the query tool executed successfully
    pub fn executed_sql(&self) -> Option<String> {
        self.intermediate_steps
            .iter()
            .rev()
            .filter(|step| step.action.tool == QUERY_TOOL_NAME && !step.is_error())
            .find_map(|step| {
                step.action
                    .tool_input
                    .get("query")
                    .and_then(Value::as_str)
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
            })
    }
}
