//! Tool trait definition and types.

use async_trait::async_trait;
use brain_core::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Arguments passed to a tool for execution.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    /// Parameters as key-value pairs.
    pub params: Map<String, Value>,
}

impl ToolArgs {
    /// Create new tool arguments with the given parameters.
    pub fn new(params: Map<String, Value>) -> Self {
        Self { params }
    }

    /// Get a non-blank string parameter, returning an error if missing or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ToolError> {
        let value = self
            .params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?
            .as_str()
            .ok_or_else(|| ToolError::InvalidParameter {
                name: key.to_string(),
                reason: "expected string".to_string(),
            })?
            .trim();
        if value.is_empty() {
            return Err(ToolError::MissingParameter(key.to_string()));
        }
        Ok(value.to_string())
    }

    /// Get an optional string parameter; blank strings count as absent.
    pub fn get_string_opt(&self, key: &str) -> Option<String> {
        self.params
            .get(key)?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The result content, usually JSON text.
    pub content: String,
    /// Whether the execution was successful.
    pub success: bool,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
        }
    }

    /// Serialize a value as a successful JSON output.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        Ok(Self::success(serde_json::to_string(value)?))
    }

    /// Create a failed output.
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: false,
        }
    }
}

/// A capability the model can call by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for dispatch).
    fn name(&self) -> &str;

    /// Description shown to the model; it decides when to call the tool.
    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// The function definition offered to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;
}

/// Build an object schema from `(name, description)` string properties, all required.
pub fn string_params(props: &[(&str, &str)]) -> Value {
    let mut properties = Map::new();
    for (name, description) in props {
        properties.insert(
            name.to_string(),
            serde_json::json!({ "type": "string", "description": description }),
        );
    }
    let required: Vec<&str> = props.iter().map(|(name, _)| *name).collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_string_counts_as_missing() {
        let mut params = Map::new();
        params.insert("city".to_string(), Value::String("  ".to_string()));
        params.insert("n".to_string(), Value::from(3));
        let args = ToolArgs::new(params);

        assert!(matches!(args.get_string("city"), Err(ToolError::MissingParameter(_))));
        assert!(args.get_string_opt("city").is_none());
        assert!(matches!(args.get_string("n"), Err(ToolError::InvalidParameter { .. })));
    }

    #[test]
    fn test_string_params_schema() {
        let schema = string_params(&[("planName1", "第一个套餐"), ("planName2", "第二个套餐")]);
        assert_eq!(schema["required"][1], "planName2");
        assert_eq!(schema["properties"]["planName1"]["type"], "string");
    }
}
