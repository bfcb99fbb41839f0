//! Mock model adapters for exercising the orchestrator without a provider.
//!
//! This crate provides implementations of the `ChatBrain` trait for testing:
//! - `ScriptedBrain` - Replays queued replies and records every call
//! - `EchoBrain` - Echoes the user text back
//! - `DelayedBrain` - Wraps another brain with artificial delay
//!
//! For real providers, use the `compat-brain` crate instead.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mock_brain::{ModelGateway, ScriptedBrain};
//!
//! let primary = Arc::new(ScriptedBrain::exact("mock-primary"));
//! let gateway = ModelGateway::new(vec![primary.clone()]).unwrap();
//! assert!(gateway.supports("mock-primary"));
//! ```

mod delayed;
mod echo;
mod scripted;

// Re-export brain-core types for convenience
pub use brain_core::{async_trait, BrainError, ChatBrain, ModelGateway, ModelPattern, ModelReply};

pub use delayed::DelayedBrain;
pub use echo::EchoBrain;
pub use scripted::{RecordedCall, ScriptedBrain};
