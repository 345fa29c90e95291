//! Tools callable by the agent

use crate::client::ToolDefinition;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A tool the model can invoke through function calling
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name as advertised to the model
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Invoke the tool; the returned text becomes the observation
    async fn call(&self, input: Value) -> Result<String>;

    /// Definition advertised to the model
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Read a string argument from a tool input
///
/// Models sometimes send the bare value instead of an object, so a plain
/// string input is accepted as the argument itself.
pub fn string_arg(input: &Value, key: &str) -> Option<String> {
    match input {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_arg_from_object() {
        let input = json!({"query": "SELECT 1"});
        assert_eq!(string_arg(&input, "query").as_deref(), Some("SELECT 1"));
        assert_eq!(string_arg(&input, "missing"), None);
    }

    #[test]
    fn test_string_arg_from_bare_string() {
        let input = json!("products, customers");
        assert_eq!(
            string_arg(&input, "table_names").as_deref(),
            Some("products, customers")
        );
    }

    #[test]
    fn test_string_arg_from_array() {
        let input = json!({"table_names": ["zepto.products", "zepto.orders"]});
        assert_eq!(
            string_arg(&input, "table_names").as_deref(),
            Some("zepto.products, zepto.orders")
        );
    }
}
