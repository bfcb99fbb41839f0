//! Delayed brain implementation - wraps another brain with artificial delay.

use std::time::Duration;

use brain_core::{
    async_trait, BrainError, ChatBrain, ChatRequest, Message, ModelPattern, ModelReply,
    ToolResultRequest,
};
use tokio::time::sleep;

/// A brain that wraps another brain and delays every model call.
///
/// Useful for exercising turn serialization and simulating provider latency.
pub struct DelayedBrain<B: ChatBrain> {
    inner: B,
    delay: Duration,
}

impl<B: ChatBrain> DelayedBrain<B> {
    /// Create a new DelayedBrain wrapping the given brain with the specified delay.
    pub fn new(inner: B, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create a brain with a delay in milliseconds.
    pub fn with_millis(inner: B, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }
}

#[async_trait]
impl<B: ChatBrain> ChatBrain for DelayedBrain<B> {
    fn name(&self) -> &str {
        "DelayedBrain"
    }

    fn model_patterns(&self) -> &[ModelPattern] {
        self.inner.model_patterns()
    }

    async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
        sleep(self.delay).await;
        self.inner.chat(request).await
    }

    async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError> {
        sleep(self.delay).await;
        self.inner.chat_with_tool_result(request).await
    }

    async fn history(&self, session_id: &str) -> Vec<Message> {
        self.inner.history(session_id).await
    }

    async fn pop_history(&self, session_id: &str) -> Vec<Message> {
        self.inner.pop_history(session_id).await
    }

    async fn add_messages(&self, session_id: &str, messages: Vec<Message>) {
        self.inner.add_messages(session_id, messages).await
    }
}
