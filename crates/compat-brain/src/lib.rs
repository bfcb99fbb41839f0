//! OpenAI-compatible chat-completions adapter.
//!
//! This crate provides a [`ChatBrain`](brain_core::ChatBrain) implementation for
//! hosted providers that speak the chat-completions dialect. Two provider
//! profiles ship with it:
//!
//! - [`Provider::Qwen`] - Alibaba DashScope compatible mode, models `qwen*`
//! - [`Provider::Doubao`] - Volcengine Ark, models `doubao*` and `ep-*` endpoints
//!
//! # Features
//!
//! - Per-session conversation history, committed only after successful calls
//! - Function tools and tool-result resubmission
//! - Full sampling parameters, including DashScope-only extensions
//! - Configurable via environment variables or a builder
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use brain_core::ModelGateway;
//! use compat_brain::{CompatBrain, Provider};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let qwen = CompatBrain::from_env(Provider::Qwen)?;
//!     let doubao = CompatBrain::from_env(Provider::Doubao)?;
//!     let gateway = ModelGateway::new(vec![Arc::new(qwen), Arc::new(doubao)])?;
//!     assert!(gateway.supports("qwen-turbo"));
//!     Ok(())
//! }
//! ```

mod api_types;
mod brain;
mod config;

pub use api_types::{
    ApiError, ApiErrorDetail, ApiFunctionCall, ApiToolCall, ChatCompletionRequest,
    ChatCompletionResponse, ChatMessage, Choice, ResponseMessage, Usage,
};
pub use brain::CompatBrain;
pub use config::{disables_thinking, CompatBrainConfig, CompatBrainConfigBuilder, Provider};

// Re-export brain-core types for convenience
pub use brain_core::{BrainError, ChatBrain, ChatRequest, ModelParameters, ModelReply};
