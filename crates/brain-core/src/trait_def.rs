//! The adapter trait every model provider implements.

use async_trait::async_trait;

use crate::{BrainError, Message, ModelParameters, ModelReply, ToolDefinition};

/// A model-name pattern an adapter claims. Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelPattern {
    /// Any model whose name starts with the prefix.
    Prefix(String),
    /// Exactly this model name.
    Exact(String),
}

impl ModelPattern {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into().to_lowercase())
    }

    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into().to_lowercase())
    }

    /// Whether this pattern claims `model`.
    pub fn matches(&self, model: &str) -> bool {
        let model = model.to_lowercase();
        match self {
            Self::Prefix(p) => model.starts_with(p.as_str()),
            Self::Exact(e) => model == *e,
        }
    }

    /// Whether some model name could be claimed by both patterns.
    pub fn overlaps(&self, other: &ModelPattern) -> bool {
        match (self, other) {
            (Self::Prefix(a), Self::Prefix(b)) => a.starts_with(b.as_str()) || b.starts_with(a.as_str()),
            (Self::Prefix(p), Self::Exact(e)) | (Self::Exact(e), Self::Prefix(p)) => {
                e.starts_with(p.as_str())
            }
            (Self::Exact(a), Self::Exact(b)) => a == b,
        }
    }
}

impl std::fmt::Display for ModelPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefix(p) => write!(f, "{}*", p),
            Self::Exact(e) => f.write_str(e),
        }
    }
}

/// First call of a turn: persona, history and the new user text.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub session_id: String,
    pub user_text: String,
    /// System prompt; omitted from the call when empty.
    pub system_prompt: String,
    /// Assistant opening line, injected only while the session history is empty.
    pub opening_line: Option<String>,
    pub params: ModelParameters,
    pub tools: Vec<ToolDefinition>,
}

/// Second call of a turn: resubmits history plus a tool result.
#[derive(Debug, Clone)]
pub struct ToolResultRequest {
    pub session_id: String,
    /// Persona to resend with the tool result; omitted when `None`.
    pub system_prompt: Option<String>,
    pub params: ModelParameters,
    pub tools: Vec<ToolDefinition>,
    /// A `tool`-role message tagged with the originating call id.
    pub tool_message: Message,
}

/// A model provider adapter.
///
/// Each adapter owns its own per-session history. `chat` commits the opening line
/// (when injected), the user message and the assistant reply only after the call
/// succeeds; `chat_with_tool_result` commits the tool message and the assistant
/// reply only after success. A failed call leaves history untouched.
#[async_trait]
pub trait ChatBrain: Send + Sync {
    /// Human-readable adapter name.
    fn name(&self) -> &str;

    /// Model names this adapter serves.
    fn model_patterns(&self) -> &[ModelPattern];

    /// Whether this adapter serves `model`.
    fn supports(&self, model: &str) -> bool {
        self.model_patterns().iter().any(|p| p.matches(model))
    }

    async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError>;

    async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError>;

    async fn history(&self, session_id: &str) -> Vec<Message>;

    /// Read and clear a session's history in one step.
    async fn pop_history(&self, session_id: &str) -> Vec<Message>;

    /// Append messages without a model call.
    async fn add_messages(&self, session_id: &str, messages: Vec<Message>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching_is_case_insensitive() {
        let p = ModelPattern::prefix("qwen");
        assert!(p.matches("Qwen-Turbo"));
        assert!(p.matches("qwen3-next-80b-a3b-instruct"));
        assert!(!p.matches("doubao-pro"));
    }

    #[test]
    fn test_overlap_detection() {
        let qwen = ModelPattern::prefix("qwen");
        let qwen3 = ModelPattern::prefix("qwen3");
        let doubao = ModelPattern::prefix("doubao");
        let ep = ModelPattern::prefix("ep-");
        let exact = ModelPattern::exact("qwen-max");

        assert!(qwen.overlaps(&qwen3));
        assert!(qwen3.overlaps(&qwen));
        assert!(exact.overlaps(&qwen));
        assert!(!doubao.overlaps(&qwen));
        assert!(!ep.overlaps(&doubao));
        assert!(!exact.overlaps(&ModelPattern::exact("qwen-plus")));
    }
}
