//! Core contracts shared by model adapters, tools and the orchestrator.
//!
//! This crate defines:
//!
//! - [`ChatBrain`] - the trait every model provider adapter implements
//! - [`ModelGateway`] - routes calls to the adapter serving a model name
//! - [`Message`] / [`ModelReply`] / [`ToolCall`] - conversation and response types
//! - [`ModelParameters`] - model name plus sampling parameters
//! - [`ConversationHistory`] - per-session history store owned by adapters
//! - [`ToolExecutor`] - trait for dispatching tool calls
//! - [`BrainError`] - error type for adapter and routing failures
//!
//! # Example
//!
//! ```rust
//! use brain_core::{ModelGateway, ModelPattern};
//!
//! let qwen = ModelPattern::prefix("qwen");
//! assert!(qwen.matches("qwen-turbo"));
//!
//! // An empty gateway routes nothing.
//! let gateway = ModelGateway::new(Vec::new()).unwrap();
//! assert!(!gateway.supports("qwen-turbo"));
//! ```

mod error;
mod gateway;
mod history;
mod message;
mod params;
mod prompt;
mod tools;
mod trait_def;

pub use error::BrainError;
pub use gateway::ModelGateway;
pub use history::ConversationHistory;
pub use message::{Message, ModelReply, Role, ToolCall};
pub use params::{ModelParameters, ModelSlot};
pub use prompt::{hash_prompt, short_hash};
pub use tools::{error_payload, FunctionDefinition, ToolDefinition, ToolExecutor, ToolRequest, ToolResult};
pub use trait_def::{ChatBrain, ChatRequest, ModelPattern, ToolResultRequest};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
