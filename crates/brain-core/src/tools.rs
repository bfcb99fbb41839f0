//! Tool calling contracts.
//!
//! A model response may ask for a tool. The orchestrator turns that call into a
//! [`ToolRequest`], hands it to a [`ToolExecutor`], and feeds the resulting
//! [`ToolResult`] back to the model as a `tool` message. Executors never fail the
//! turn: every failure becomes an `{"error": ...}` payload the model can react to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Function schema offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: Value,
}

/// A tool offered to the model, in the chat-completions `tools` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// A `function` tool definition.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Result of a tool execution.
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// The tool call ID this result corresponds to.
    pub tool_call_id: String,
    /// Result content, sent back to the model verbatim.
    pub content: String,
    /// Whether the tool execution succeeded.
    pub success: bool,
}

impl ToolResult {
    /// Create a successful tool result.
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: true,
        }
    }

    /// Create a failed tool result with an `{"error": ...}` JSON body.
    pub fn error(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: error_payload(&error.into()),
            success: false,
        }
    }
}

/// Render an error message as the `{"error": "..."}` payload models receive.
pub fn error_payload(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// A request to execute a tool.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Call id assigned by the model.
    pub id: String,
    /// Name of the tool to execute.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: Map<String, Value>,
    /// Session the call belongs to, for logging.
    pub session_id: Option<String>,
}

impl ToolRequest {
    /// Parse arguments from a JSON string.
    ///
    /// An empty string is treated as `{}`; anything that is not a JSON object is an error.
    pub fn from_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: &str,
    ) -> Result<Self, serde_json::Error> {
        let raw = if arguments_json.trim().is_empty() {
            "{}"
        } else {
            arguments_json
        };
        let arguments: Map<String, Value> = serde_json::from_str(raw)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            arguments,
            session_id: None,
        })
    }

    /// Attach the owning session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Get a string argument by name.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}

/// Dispatches named tool calls to concrete handlers.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool. Unknown tools and handler failures yield an error result.
    async fn execute(&self, request: ToolRequest) -> ToolResult;

    /// Definitions of the tools this executor can run, offered to the model.
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_error_is_json() {
        let result = ToolResult::error("call-456", "unknown tool");
        assert!(!result.success);
        assert_eq!(result.content, r#"{"error":"unknown tool"}"#);
    }

    #[test]
    fn test_tool_request_parsing() {
        let request = ToolRequest::from_call(
            "id-1",
            "compareTwoPlans",
            r#"{"planName1": "畅享套餐", "planName2": "升档新套餐"}"#,
        )
        .unwrap();

        assert_eq!(request.name, "compareTwoPlans");
        assert_eq!(request.get_string("planName1"), Some("畅享套餐"));
        assert!(request.session_id.is_none());
    }

    #[test]
    fn test_empty_arguments_are_empty_object() {
        let request = ToolRequest::from_call("id-1", "queryAllPlans", "  ").unwrap();
        assert!(request.arguments.is_empty());
    }

    #[test]
    fn test_non_object_arguments_rejected() {
        assert!(ToolRequest::from_call("id-1", "x", "[1, 2]").is_err());
        assert!(ToolRequest::from_call("id-1", "x", "{not json").is_err());
    }

    #[test]
    fn test_definition_serializes_type_field() {
        let def = ToolDefinition::function("queryAllPlans", "List plans", serde_json::json!({"type": "object"}));
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "queryAllPlans");
    }
}
