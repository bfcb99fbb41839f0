//! Model sampling parameters.

use serde::{Deserialize, Serialize};

use crate::BrainError;

/// Named parameter profiles the orchestrator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSlot {
    /// Cheap model used only for intent/emotion classification.
    Classifier,
    /// Model that produces the customer-facing reply.
    Primary,
    /// Cheap model that picks a fast-track data tool.
    Router,
}

/// Model name plus sampling parameters for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    pub model_name: String,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl ModelParameters {
    /// Parameters with provider-typical defaults (temperature 0.7, top_p 0.8).
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            temperature: 0.7,
            top_p: 0.8,
            max_tokens: None,
            repetition_penalty: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_repetition_penalty(mut self, penalty: f32) -> Self {
        self.repetition_penalty = Some(penalty);
        self
    }

    /// Check ranges: temperature in [0, 2], top_p in (0, 1].
    pub fn validate(&self) -> Result<(), BrainError> {
        if self.model_name.trim().is_empty() {
            return Err(BrainError::Configuration("model name is empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(BrainError::Configuration(format!(
                "temperature {} outside [0, 2]",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(BrainError::Configuration(format!(
                "top_p {} outside (0, 1]",
                self.top_p
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ModelParameters::new("qwen-turbo").validate().is_ok());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let hot = ModelParameters::new("qwen-turbo").with_temperature(2.5);
        assert!(matches!(hot.validate(), Err(BrainError::Configuration(_))));

        let zero_p = ModelParameters::new("qwen-turbo").with_top_p(0.0);
        assert!(zero_p.validate().is_err());

        let unnamed = ModelParameters::new("  ");
        assert!(unnamed.validate().is_err());
    }
}
