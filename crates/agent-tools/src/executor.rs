//! ToolExecutor implementation backed by ToolRegistry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use brain_core::{ToolDefinition, ToolExecutor, ToolRequest, ToolResult};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::{ToolError, ToolRegistry};

/// Error text for a tool name the registry does not know.
pub const UNKNOWN_TOOL: &str = "unknown tool";

/// Error text for a registered tool that policy has switched off.
pub const TOOL_DISABLED: &str = "tool disabled";

/// Error text for a tool that ran past the policy time limit.
pub const TOOL_TIMED_OUT: &str = "tool execution timed out";

/// Which tools may run, how they are described, and for how long they may run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolPolicy {
    /// When set, only these tools are offered and executed.
    pub allowlist: Option<HashSet<String>>,
    /// Tools switched off by name. Wins over the allowlist.
    pub disabled: HashSet<String>,
    /// Description overrides by tool name.
    pub descriptions: HashMap<String, String>,
    /// Per-call time limit.
    pub timeout: Option<Duration>,
}

impl ToolPolicy {
    pub fn allow_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowlist = self.allowlist.get_or_insert_with(HashSet::new);
        for tool in tools {
            allowlist.insert(tool.into());
        }
        self
    }

    pub fn disable_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Offer `tool` to the model with `description` instead of its own.
    pub fn describe(mut self, tool: impl Into<String>, description: impl Into<String>) -> Self {
        self.descriptions.insert(tool.into(), description.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether `tool` may be offered and executed.
    pub fn allows(&self, tool: &str) -> bool {
        !self.disabled.contains(tool)
            && self
                .allowlist
                .as_ref()
                .map_or(true, |allowed| allowed.contains(tool))
    }

    /// Drop disallowed definitions and apply description overrides.
    ///
    /// Blank overrides are ignored.
    pub fn apply(&self, definitions: Vec<ToolDefinition>) -> Vec<ToolDefinition> {
        definitions
            .into_iter()
            .filter(|def| self.allows(def.name()))
            .map(|mut def| {
                if let Some(text) = self.descriptions.get(def.name()) {
                    if !text.trim().is_empty() {
                        def.function.description = text.trim().to_string();
                    }
                }
                def
            })
            .collect()
    }
}

/// Tool Executor dispatching model tool calls to a [`ToolRegistry`].
///
/// Never fails: unknown tools, disabled tools, handler errors and timeouts all
/// come back as `{"error": ...}` results for the model to react to.
pub struct RegistryToolExecutor {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
}

impl RegistryToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_policy(registry, ToolPolicy::default())
    }

    pub fn with_policy(registry: ToolRegistry, policy: ToolPolicy) -> Self {
        Self {
            registry: Arc::new(registry),
            policy,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RegistryToolExecutor {
    async fn execute(&self, request: ToolRequest) -> ToolResult {
        let session = request.session_id.as_deref().unwrap_or("-");

        if !self.registry.has_tool(&request.name) {
            warn!(session, tool = %request.name, "model requested unknown tool");
            return ToolResult::error(&request.id, UNKNOWN_TOOL);
        }

        if !self.policy.allows(&request.name) {
            warn!(session, tool = %request.name, "model requested disabled tool");
            return ToolResult::error(&request.id, TOOL_DISABLED);
        }

        let execute_future = self.registry.execute(&request.name, request.arguments.clone());

        let outcome = match self.policy.timeout {
            Some(limit) => match timeout(limit, execute_future).await {
                Ok(result) => result,
                Err(_) => Err(ToolError::ExecutionFailed(TOOL_TIMED_OUT.to_string())),
            },
            None => execute_future.await,
        };

        match outcome {
            Ok(output) if output.success => {
                info!(session, tool = %request.name, "tool succeeded");
                ToolResult::success(&request.id, output.content)
            }
            Ok(output) => {
                warn!(session, tool = %request.name, "tool reported failure: {}", output.content);
                ToolResult::error(&request.id, output.content)
            }
            Err(error) => {
                warn!(session, tool = %request.name, "tool failed: {}", error);
                ToolResult::error(&request.id, error.to_string())
            }
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.policy.apply(self.registry.definitions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tool, ToolArgs, ToolOutput};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "counting_tool"
        }

        fn description(&self) -> &str {
            "Counts executions"
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            let current = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(ToolOutput::success(format!("{{\"count\":{}}}", current)))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing_tool"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
            args.get_string("required")?;
            Ok(ToolOutput::success("unreachable"))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow_tool"
        }

        fn description(&self) -> &str {
            "Sleeps"
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(ToolOutput::success("late"))
        }
    }

    fn registry(counter: Arc<AtomicUsize>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(CountingTool { count: counter });
        registry.register(FailingTool);
        registry.register(SlowTool);
        registry
    }

    fn request(name: &str) -> ToolRequest {
        ToolRequest::from_call("call-1", name, "{}").unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_error_payload() {
        let executor = RegistryToolExecutor::new(ToolRegistry::new());
        let result = executor.execute(request("nope")).await;
        assert!(!result.success);
        assert_eq!(result.content, r#"{"error":"unknown tool"}"#);
        assert_eq!(result.tool_call_id, "call-1");
    }

    #[tokio::test]
    async fn test_handler_error_becomes_payload() {
        let executor = RegistryToolExecutor::new(registry(Arc::new(AtomicUsize::new(0))));
        let result = executor.execute(request("failing_tool")).await;
        assert!(!result.success);
        let payload: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert!(payload["error"].as_str().unwrap().contains("required"));
    }

    #[tokio::test]
    async fn test_allowlist_blocks_and_hides() {
        let counter = Arc::new(AtomicUsize::new(0));
        let policy = ToolPolicy::default().allow_tools(["failing_tool"]);
        let executor = RegistryToolExecutor::with_policy(registry(counter.clone()), policy);

        let result = executor.execute(request("counting_tool")).await;
        assert_eq!(result.content, r#"{"error":"tool disabled"}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let names: Vec<String> = executor
            .definitions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["failing_tool"]);
    }

    #[tokio::test]
    async fn test_disabled_tool_wins_over_allowlist() {
        let counter = Arc::new(AtomicUsize::new(0));
        let policy = ToolPolicy::default()
            .allow_tools(["counting_tool", "failing_tool"])
            .disable_tools(["counting_tool"]);
        let executor = RegistryToolExecutor::with_policy(registry(counter.clone()), policy);

        let result = executor.execute(request("counting_tool")).await;
        assert_eq!(result.content, r#"{"error":"tool disabled"}"#);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!executor.policy().allows("counting_tool"));
        assert!(executor.policy().allows("failing_tool"));
    }

    #[test]
    fn test_description_overrides() {
        let policy = ToolPolicy::default()
            .describe("counting_tool", "  Counts how often it ran  ")
            .describe("failing_tool", " ");
        let definitions = policy.apply(registry(Arc::new(AtomicUsize::new(0))).definitions());

        assert_eq!(definitions.len(), 3);
        assert_eq!(definitions[0].function.description, "Counts how often it ran");
        // Blank override keeps the tool's own text.
        assert_eq!(definitions[1].function.description, "Always fails");
    }

    #[tokio::test]
    async fn test_timeout() {
        let policy = ToolPolicy::default().with_timeout(Duration::from_millis(20));
        let executor =
            RegistryToolExecutor::with_policy(registry(Arc::new(AtomicUsize::new(0))), policy);
        let result = executor.execute(request("slow_tool")).await;
        assert!(!result.success);
        assert!(result.content.contains("timed out"));
    }

    #[tokio::test]
    async fn test_success_passes_content_through() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = RegistryToolExecutor::new(registry(counter.clone()));
        let result = executor.execute(request("counting_tool")).await;
        assert!(result.success);
        assert_eq!(result.content, r#"{"count":1}"#);
    }
}
