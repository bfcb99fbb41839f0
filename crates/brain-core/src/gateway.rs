//! Routes model calls to the adapter that serves the named model.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{BrainError, ChatBrain, ChatRequest, Message, ModelReply, ToolResultRequest};

/// Provider-agnostic front door for model calls.
///
/// Built once from a set of adapters. Overlapping model patterns are rejected at
/// construction, so routing never depends on registration order.
pub struct ModelGateway {
    adapters: Vec<Arc<dyn ChatBrain>>,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.adapters.iter().map(|a| a.name()).collect();
        f.debug_struct("ModelGateway").field("adapters", &names).finish()
    }
}

impl ModelGateway {
    /// Create a gateway, failing fast if two adapters claim the same models.
    pub fn new(adapters: Vec<Arc<dyn ChatBrain>>) -> Result<Self, BrainError> {
        for (i, a) in adapters.iter().enumerate() {
            for b in adapters.iter().skip(i + 1) {
                for pa in a.model_patterns() {
                    for pb in b.model_patterns() {
                        if pa.overlaps(pb) {
                            return Err(BrainError::AmbiguousRoute(format!(
                                "{} ({}) overlaps {} ({})",
                                a.name(),
                                pa,
                                b.name(),
                                pb
                            )));
                        }
                    }
                }
            }
        }

        let names: Vec<&str> = adapters.iter().map(|a| a.name()).collect();
        info!("Model gateway ready with adapters: {:?}", names);

        Ok(Self { adapters })
    }

    /// The adapter serving `model`.
    pub fn route(&self, model: &str) -> Result<&Arc<dyn ChatBrain>, BrainError> {
        self.adapters
            .iter()
            .find(|a| a.supports(model))
            .ok_or_else(|| BrainError::UnsupportedModel(model.to_string()))
    }

    /// Whether any adapter serves `model`.
    pub fn supports(&self, model: &str) -> bool {
        self.route(model).is_ok()
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
        let adapter = self.route(&request.params.model_name)?;
        debug!(
            session = %request.session_id,
            model = %request.params.model_name,
            adapter = adapter.name(),
            "gateway chat"
        );
        adapter.chat(request).await
    }

    pub async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError> {
        let adapter = self.route(&request.params.model_name)?;
        debug!(
            session = %request.session_id,
            model = %request.params.model_name,
            adapter = adapter.name(),
            "gateway chat with tool result"
        );
        adapter.chat_with_tool_result(request).await
    }

    /// History of a session across every adapter, in registration order.
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        let mut all = Vec::new();
        for adapter in &self.adapters {
            all.extend(adapter.history(session_id).await);
        }
        all
    }

    /// Read and clear a session's history on every adapter.
    pub async fn pop_history(&self, session_id: &str) -> Vec<Message> {
        let mut all = Vec::new();
        for adapter in &self.adapters {
            all.extend(adapter.pop_history(session_id).await);
        }
        all
    }

    /// Inject messages into the history kept by the adapter serving `model`.
    pub async fn add_messages(
        &self,
        session_id: &str,
        model: &str,
        messages: Vec<Message>,
    ) -> Result<(), BrainError> {
        let adapter = self.route(model)?;
        adapter.add_messages(session_id, messages).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConversationHistory, ModelParameters, ModelPattern};
    use async_trait::async_trait;

    struct FixedBrain {
        name: &'static str,
        patterns: Vec<ModelPattern>,
        history: ConversationHistory,
    }

    impl FixedBrain {
        fn new(name: &'static str, patterns: Vec<ModelPattern>) -> Arc<dyn ChatBrain> {
            Arc::new(Self {
                name,
                patterns,
                history: ConversationHistory::unbounded(),
            })
        }
    }

    #[async_trait]
    impl ChatBrain for FixedBrain {
        fn name(&self) -> &str {
            self.name
        }

        fn model_patterns(&self) -> &[ModelPattern] {
            &self.patterns
        }

        async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
            let reply = ModelReply::text(format!("{}:{}", self.name, request.user_text));
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
            Ok(ModelReply::text(request.tool_message.content))
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

    fn request(model: &str) -> ChatRequest {
        ChatRequest {
            session_id: "s1".to_string(),
            user_text: "hi".to_string(),
            system_prompt: String::new(),
            opening_line: None,
            params: ModelParameters::new(model),
            tools: Vec::new(),
        }
    }

    #[test]
    fn test_overlapping_adapters_rejected() {
        let result = ModelGateway::new(vec![
            FixedBrain::new("a", vec![ModelPattern::prefix("qwen")]),
            FixedBrain::new("b", vec![ModelPattern::exact("qwen-max")]),
        ]);
        assert!(matches!(result, Err(BrainError::AmbiguousRoute(_))));
    }

    #[tokio::test]
    async fn test_routes_by_model_name() {
        let gateway = ModelGateway::new(vec![
            FixedBrain::new("qwen", vec![ModelPattern::prefix("qwen")]),
            FixedBrain::new("doubao", vec![ModelPattern::prefix("doubao"), ModelPattern::prefix("ep-")]),
        ])
        .unwrap();

        let reply = gateway.chat(request("ep-2024")).await.unwrap();
        assert_eq!(reply.text, "doubao:hi");

        let reply = gateway.chat(request("QWEN-turbo")).await.unwrap();
        assert_eq!(reply.text, "qwen:hi");

        let err = gateway.chat(request("gpt-4o")).await.unwrap_err();
        assert!(matches!(err, BrainError::UnsupportedModel(m) if m == "gpt-4o"));
    }

    #[tokio::test]
    async fn test_history_spans_adapters() {
        let gateway = ModelGateway::new(vec![
            FixedBrain::new("qwen", vec![ModelPattern::prefix("qwen")]),
            FixedBrain::new("doubao", vec![ModelPattern::prefix("doubao")]),
        ])
        .unwrap();

        gateway.chat(request("qwen-turbo")).await.unwrap();
        gateway
            .add_messages("s1", "doubao-pro", vec![Message::user(" ")])
            .await
            .unwrap();

        assert_eq!(gateway.history("s1").await.len(), 3);
        assert_eq!(gateway.pop_history("s1").await.len(), 3);
        assert!(gateway.history("s1").await.is_empty());
    }
}
