//! Turn orchestrator for a task-driven customer-service agent.
//!
//! This crate provides the [`Orchestrator`] type, which turns one caller
//! utterance into one agent reply while tracking progress through a numbered
//! workflow.
//!
//! # Features
//!
//! - Scripted handling of interrupts, silence signals and finished workflows
//! - Intent, emotion and sensitivity classification on a cheap model
//! - Per-axis or rule-engine strategy selection
//! - Persona rendering with the currently available tasks and safety redlines
//! - Optional fast track: a router model picks a simple data tool directly
//! - One tool round per turn, resubmitted to the model with its result
//! - Per-tool switches, description overrides and a tool timeout
//! - Task completion from `我已完成流程[...]` markers in replies
//!
//! # Architecture
//!
//! ```text
//! Caller utterance
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Override check (打断 / silence / workflow complete)     │
//! │         ↓                                                   │
//! │  2. Classify (classifier model, throwaway session)          │
//! │         ↓                                                   │
//! │  3. Sensitive and intent gates → scripted fallbacks         │
//! │         ↓                                                   │
//! │  4. Strategy + persona (available tasks, status code)       │
//! │         ↓                                                   │
//! │  5. Fast track (router model, when enabled)                 │
//! │     • hit → execute the picked tool                         │
//! │         ↓                                                   │
//! │  6. Primary model call                                      │
//! │     • tool call → execute → second call with the result     │
//! │         ↓                                                   │
//! │  7. Completion scan → workflow tracker                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_tools::{default_registry, RegistryToolExecutor};
//! use brain_core::{ModelGateway, ModelParameters};
//! use mock_brain::ScriptedBrain;
//! use orchestrator::{Orchestrator, StaticConfigSource, Terminal};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let brain = Arc::new(ScriptedBrain::exact("mock"));
//! let gateway = Arc::new(ModelGateway::new(vec![brain.clone()])?);
//! let config = StaticConfigSource::builder()
//!     .primary_params(ModelParameters::new("mock"))
//!     .classifier_params(ModelParameters::new("mock"))
//!     .build();
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(config),
//!     gateway,
//!     Arc::new(RegistryToolExecutor::new(default_registry())),
//! );
//!
//! brain.push_text(r#"{"intent": "闲聊", "emotion": "高兴"}"#).await;
//! brain.push_text("您好！我已完成流程[产品介绍]").await;
//!
//! let turn = orchestrator.handle_turn("caller-1", "你好").await?;
//! assert_eq!(turn.terminal, Terminal::DirectReply);
//! assert_eq!(turn.diagnostics.completed_this_turn, vec!["1. 产品介绍*"]);
//! # Ok(())
//! # }
//! ```

mod archive;
mod classifier;
mod completion;
mod config;
mod diagnostics;
mod error;
mod orchestrator;
mod prompt;
mod router;
mod session;
mod strategy;
mod workflow;

// Public exports
pub use archive::{render_markdown, HistoryArchive, MarkdownArchive, NoopArchive};
pub use classifier::{
    parse_classification, ClassificationResult, Classifier, ClassifierFailure, ClassifierOutcome,
    DirectTool, DEFAULT_EMOTION, DEFAULT_INTENT,
};
pub use completion::{completed_task_names, COMPLETION_MARKER};
pub use config::{
    default_strategies, split_task_list, split_tool_list, ConfigSource, ConfigValues, FeatureFlags,
    StaticConfigBuilder, StaticConfigSource, StrategyPolicy, TurnConfig, DEFAULT_CLASSIFIER_MODEL,
    DEFAULT_CLASSIFIER_PROMPT, DEFAULT_DEPENDENCIES, DEFAULT_FALLBACK_TEXT, DEFAULT_OPENING_LINE,
    DEFAULT_PERSONA_TEMPLATE, DEFAULT_PRIMARY_MODEL, DEFAULT_ROUTER_MODEL, DEFAULT_ROUTER_PROMPT,
    DEFAULT_SAFETY_REDLINES, DEFAULT_SENSITIVE_TEXT, DEFAULT_TASKS,
};
pub use diagnostics::{Diagnostics, StageTimings, StrategyTag};
pub use error::OrchestratorError;
pub use orchestrator::{
    Orchestrator, TaskState, Terminal, TurnResult, BAD_TOOL_ARGUMENTS_REPLY, INTERRUPT_REPLY,
    INTERRUPT_SIGNAL, SILENCE_CLOSING_REPLY, SILENCE_SIGNAL, SILENCE_REPLIES, SILENCE_THRESHOLD,
    TOOL_FALLBACK_REPLY, WORKFLOW_COMPLETE_REPLY,
};
pub use prompt::{
    append_redlines, build_persona, StatusCode, NO_TASKS_SENTINEL, SAFETY_HEADER, STRATEGY_HEADER,
    TASK_SEPARATOR,
};
pub use router::{render_router_prompt, tool_listing, RouteOutcome, Router, FAST_TRACK_TOOLS};
pub use session::{Session, SessionStore, DEFAULT_MAX_SESSIONS};
pub use strategy::{
    known_intents, remap_intent, selector_for, AxisStrategySelector, RuleStrategySelector, Strategy,
    StrategyAxis, StrategyRule, StrategySelector, UNKNOWN_INTENT,
};
pub use workflow::{
    find_task, sanitize_task_name, DependencyRules, Task, TaskStatus, WorkflowTracker,
    ALWAYS_AVAILABLE_MARKER,
};

// Re-export commonly used types from dependencies
pub use brain_core::{Message, ModelGateway, ModelParameters, ModelSlot};
