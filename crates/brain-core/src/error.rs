//! Error types for model adapters and the gateway.

use thiserror::Error;

/// Errors raised while talking to a model provider or routing to one.
#[derive(Debug, Error)]
pub enum BrainError {
    /// Adapter or gateway is misconfigured (missing key, bad parameters).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure reaching the provider.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered but the answer could not be used.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    /// No registered adapter claims this model name.
    #[error("no adapter supports model '{0}'")]
    UnsupportedModel(String),

    /// Two adapters claim overlapping model names.
    #[error("ambiguous model routing: {0}")]
    AmbiguousRoute(String),

    /// The provider did not answer in time.
    #[error("request timed out")]
    Timeout,
}
