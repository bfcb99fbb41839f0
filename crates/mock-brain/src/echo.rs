//! Echo brain implementation - echoes the user text back.

use brain_core::{
    async_trait, BrainError, ChatBrain, ChatRequest, ConversationHistory, Message, ModelPattern,
    ModelReply, ToolResultRequest,
};

/// A brain that answers every call with the user text (or the tool result).
///
/// Useful for testing message flow without scripting replies.
#[derive(Debug)]
pub struct EchoBrain {
    patterns: Vec<ModelPattern>,
    prefix: Option<String>,
    history: ConversationHistory,
}

impl EchoBrain {
    /// Create an EchoBrain serving models with the given prefix.
    pub fn new(model_prefix: &str) -> Self {
        Self {
            patterns: vec![ModelPattern::prefix(model_prefix)],
            prefix: None,
            history: ConversationHistory::unbounded(),
        }
    }

    /// Add a prefix to every reply.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mock_brain::EchoBrain;
    ///
    /// let brain = EchoBrain::new("echo").with_prefix("Echo: ");
    /// // Will respond with "Echo: <user text>"
    /// ```
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn render(&self, text: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, text),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl ChatBrain for EchoBrain {
    fn name(&self) -> &str {
        "EchoBrain"
    }

    fn model_patterns(&self) -> &[ModelPattern] {
        &self.patterns
    }

    async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
        let reply = ModelReply::text(self.render(&request.user_text));
        self.history
            .append(
                &request.session_id,
                vec![Message::user(request.user_text), reply.to_message()],
            )
            .await;
        Ok(reply)
    }

    async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError> {
        let reply = ModelReply::text(self.render(&request.tool_message.content));
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

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::ModelParameters;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            session_id: "s1".to_string(),
            user_text: text.to_string(),
            system_prompt: String::new(),
            opening_line: None,
            params: ModelParameters::new("echo-1"),
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_echo_brain() {
        let brain = EchoBrain::new("echo");
        let reply = brain.chat(request("Hello, world!")).await.unwrap();
        assert_eq!(reply.text, "Hello, world!");
        assert_eq!(brain.history("s1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_echo_brain_with_prefix() {
        let brain = EchoBrain::new("echo").with_prefix("Bot: ");
        let reply = brain.chat(request("Hi")).await.unwrap();
        assert_eq!(reply.text, "Bot: Hi");
        assert!(brain.supports("ECHO-2"));
    }
}
