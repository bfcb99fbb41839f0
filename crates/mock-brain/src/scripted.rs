//! Scripted brain - replays queued replies and records every call.

use std::collections::VecDeque;

use brain_core::{
    async_trait, BrainError, ChatBrain, ChatRequest, ConversationHistory, Message, ModelPattern,
    ModelReply, ToolCall, ToolResultRequest,
};
use tokio::sync::Mutex;

/// A call received by a [`ScriptedBrain`].
#[derive(Debug, Clone)]
pub enum RecordedCall {
    Chat(ChatRequest),
    ToolResult(ToolResultRequest),
}

impl RecordedCall {
    pub fn as_chat(&self) -> Option<&ChatRequest> {
        match self {
            RecordedCall::Chat(request) => Some(request),
            RecordedCall::ToolResult(_) => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResultRequest> {
        match self {
            RecordedCall::ToolResult(request) => Some(request),
            RecordedCall::Chat(_) => None,
        }
    }
}

/// A brain that answers calls from a queue, in order.
///
/// History follows the same commit rules as a real adapter: the opening line
/// (when injected into an empty history), the user message and the reply are
/// committed only when the queued entry is a success.
///
/// # Example
///
/// ```rust
/// use mock_brain::ScriptedBrain;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let brain = ScriptedBrain::exact("mock-primary");
/// brain.push_text("您好！").await;
/// brain.push_tool_call("call_1", "queryAllPlans", "{}").await;
/// assert_eq!(brain.remaining().await, 2);
/// # }
/// ```
pub struct ScriptedBrain {
    name: String,
    patterns: Vec<ModelPattern>,
    script: Mutex<VecDeque<Result<ModelReply, BrainError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    history: ConversationHistory,
}

impl ScriptedBrain {
    /// Serve models matching any of `patterns`.
    pub fn new(name: impl Into<String>, patterns: Vec<ModelPattern>) -> Self {
        Self {
            name: name.into(),
            patterns,
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            history: ConversationHistory::unbounded(),
        }
    }

    /// Serve exactly one model name.
    pub fn exact(model: &str) -> Self {
        Self::new(format!("scripted-{}", model), vec![ModelPattern::exact(model)])
    }

    /// Queue a reply (or an error) for the next call.
    pub async fn push(&self, reply: Result<ModelReply, BrainError>) {
        self.script.lock().await.push_back(reply);
    }

    pub async fn push_text(&self, text: &str) {
        self.push(Ok(ModelReply::text(text))).await;
    }

    pub async fn push_tool_call(&self, id: &str, name: &str, arguments_json: &str) {
        self.push(Ok(ModelReply::tool_call(ToolCall::new(id, name, arguments_json))))
            .await;
    }

    pub async fn push_error(&self, error: BrainError) {
        self.push(Err(error)).await;
    }

    /// Replies still queued.
    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn next_reply(&self) -> Result<ModelReply, BrainError> {
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(BrainError::ProcessingFailed(format!("{} script exhausted", self.name))))
    }
}

#[async_trait]
impl ChatBrain for ScriptedBrain {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_patterns(&self) -> &[ModelPattern] {
        &self.patterns
    }

    async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
        self.calls.lock().await.push(RecordedCall::Chat(request.clone()));
        let reply = self.next_reply().await?;

        let mut commit = Vec::new();
        if self.history.is_empty(&request.session_id).await {
            if let Some(opening) = request.opening_line.filter(|o| !o.is_empty()) {
                commit.push(Message::assistant(opening));
            }
        }
        commit.push(Message::user(request.user_text));
        commit.push(reply.to_message());
        self.history.append(&request.session_id, commit).await;

        Ok(reply)
    }

    async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError> {
        self.calls
            .lock()
            .await
            .push(RecordedCall::ToolResult(request.clone()));
        let reply = self.next_reply().await?;

        self.history
            .append(&request.session_id, vec![request.tool_message, reply.to_message()])
            .await;

        Ok(reply)
    }

    async fn history(&self, session_id: &str) -> Vec<Message> {
        self.history.get(session_id).await
    }

    async fn pop_history(&self, session_id: &str) -> Vec<Message> {
        self.history.take(session_id).await
    }

    async fn add_messages(&self, session_id: &str, messages: Vec<Message>) {
        self.history.append(session_id, messages).await;
    }
}
