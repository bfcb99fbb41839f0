//! Error types for orchestrator operations.

use brain_core::BrainError;
use thiserror::Error;

/// Errors that abort a turn or a session operation.
///
/// Classifier failures, tool failures and fallback replies never show up here;
/// they complete the turn and are reported through diagnostics instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A model call or model routing failed.
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),

    /// Configuration values are unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing the history archive failed.
    #[error("archive failed: {0}")]
    Archive(#[from] std::io::Error),
}
