//! CompatBrain: a ChatBrain over an OpenAI-compatible chat-completions API.

use brain_core::{
    async_trait, short_hash, BrainError, ChatBrain, ChatRequest, ConversationHistory, Message,
    ModelParameters, ModelPattern, ModelReply, ToolCall, ToolDefinition, ToolResultRequest,
};
use reqwest::Client;
use tracing::{debug, info, trace, warn};

use crate::api_types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::{disables_thinking, CompatBrainConfig};

/// Reply used when the provider returns neither text nor tool calls.
const EMPTY_REPLY_FALLBACK: &str = "抱歉，我暂时无法回答这个问题。";

/// Adapter for one hosted provider.
///
/// Keeps its own per-session history and commits to it only after a call
/// succeeds.
pub struct CompatBrain {
    client: Client,
    config: CompatBrainConfig,
    history: ConversationHistory,
    name: String,
}

impl CompatBrain {
    /// Create a new CompatBrain with the given configuration.
    pub fn new(config: CompatBrainConfig) -> Result<Self, BrainError> {
        if config.api_key.is_empty() {
            return Err(BrainError::Configuration(format!(
                "{} API key is empty",
                config.provider.name()
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrainError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        let history = ConversationHistory::new(config.max_history_messages);
        let name = format!("compat-{}", config.provider.name());

        info!(
            "{} initialized at {} for models {:?}",
            name,
            config.api_url,
            config.model_patterns.iter().map(|p| p.to_string()).collect::<Vec<_>>()
        );

        Ok(Self {
            client,
            config,
            history,
            name,
        })
    }

    /// Create a CompatBrain from environment variables.
    ///
    /// See [`CompatBrainConfig::from_env`] for the variables read.
    pub fn from_env(provider: crate::Provider) -> Result<Self, BrainError> {
        Self::new(CompatBrainConfig::from_env(provider)?)
    }

    /// Get the configuration.
    pub fn config(&self) -> &CompatBrainConfig {
        &self.config
    }

    /// Build the request body for a call.
    pub(crate) fn build_request(
        &self,
        params: &ModelParameters,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> ChatCompletionRequest {
        let dashscope = self.config.provider.supports_dashscope_extensions();
        ChatCompletionRequest {
            model: params.model_name.clone(),
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            presence_penalty: params.presence_penalty,
            frequency_penalty: params.frequency_penalty,
            repetition_penalty: if dashscope { params.repetition_penalty } else { None },
            enable_thinking: if dashscope && disables_thinking(&params.model_name) {
                Some(false)
            } else {
                None
            },
            tools: tools.to_vec(),
        }
    }

    /// Make a chat completion request.
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, BrainError> {
        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));

        trace!("Sending request to {}: {:?}", url, request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrainError::Timeout
                } else {
                    BrainError::Network(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                return Err(BrainError::ProcessingFailed(format!(
                    "API error ({}): {}",
                    status.as_u16(),
                    api_error.error.message
                )));
            }

            return Err(BrainError::ProcessingFailed(format!(
                "API error ({}): {}",
                status.as_u16(),
                error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BrainError::ProcessingFailed(format!("Failed to parse response: {}", e)))?;

        if let Some(ref usage) = completion.usage {
            debug!(
                model = %completion.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        Ok(completion)
    }

    /// Send `messages` and turn the first choice into a reply.
    async fn complete(
        &self,
        params: &ModelParameters,
        messages: Vec<ChatMessage>,
        tools: &[ToolDefinition],
    ) -> Result<ModelReply, BrainError> {
        let request = self.build_request(params, messages, tools);
        let completion = self.chat_completion(request).await?;
        reply_from_completion(completion)
    }

    fn wire_messages(system_prompt: Option<&str>, history: &[Message]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if let Some(prompt) = system_prompt.filter(|p| !p.is_empty()) {
            messages.push(ChatMessage::system(prompt));
        }
        messages.extend(history.iter().map(ChatMessage::from));
        messages
    }
}

/// Extract the reply from the first choice.
pub(crate) fn reply_from_completion(
    completion: ChatCompletionResponse,
) -> Result<ModelReply, BrainError> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BrainError::ProcessingFailed("response contained no choices".to_string()))?;

    let tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(ToolCall::from)
        .collect();

    let text = match choice.message.content {
        Some(text) => text,
        None if !tool_calls.is_empty() => String::new(),
        None => {
            warn!("Provider returned an empty message; using fallback text");
            EMPTY_REPLY_FALLBACK.to_string()
        }
    };

    Ok(ModelReply { text, tool_calls })
}

#[async_trait]
impl ChatBrain for CompatBrain {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_patterns(&self) -> &[ModelPattern] {
        &self.config.model_patterns
    }

    async fn chat(&self, request: ChatRequest) -> Result<ModelReply, BrainError> {
        let mut history = self.history.get(&request.session_id).await;

        let mut pending = Vec::new();
        if history.is_empty() {
            if let Some(opening) = request.opening_line.as_ref().filter(|o| !o.is_empty()) {
                pending.push(Message::assistant(opening.clone()));
            }
        }
        pending.push(Message::user(request.user_text.clone()));
        history.extend(pending.iter().cloned());

        debug!(
            session = %request.session_id,
            model = %request.params.model_name,
            persona = %short_hash(&request.system_prompt),
            history_len = history.len(),
            tools = request.tools.len(),
            "{} chat",
            self.name
        );

        let messages = Self::wire_messages(Some(&request.system_prompt), &history);
        let reply = self.complete(&request.params, messages, &request.tools).await?;

        pending.push(reply.to_message());
        self.history.append(&request.session_id, pending).await;

        Ok(reply)
    }

    async fn chat_with_tool_result(
        &self,
        request: ToolResultRequest,
    ) -> Result<ModelReply, BrainError> {
        let mut history = self.history.get(&request.session_id).await;
        history.push(request.tool_message.clone());

        debug!(
            session = %request.session_id,
            model = %request.params.model_name,
            tool_call_id = ?request.tool_message.tool_call_id,
            "{} chat with tool result",
            self.name
        );

        let messages = Self::wire_messages(request.system_prompt.as_deref(), &history);
        let reply = self.complete(&request.params, messages, &request.tools).await?;

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
