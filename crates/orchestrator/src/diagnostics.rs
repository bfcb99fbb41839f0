//! Per-turn diagnostics.

use serde::Serialize;

use crate::classifier::DirectTool;

/// Which path produced the reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyTag {
    ManualInterrupt,
    SilencePrompt,
    SilenceClosing,
    WorkflowComplete,
    SensitiveFallback,
    UnknownFallback,
    /// A strategy directive was appended to the persona.
    Strategy,
    #[default]
    NoStrategy,
    BadToolArguments,
    /// The second model call gave nothing usable; a scripted reply stood in.
    ToolFallback,
}

/// Stage durations in milliseconds. Stages that did not run are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub classify_ms: Option<u64>,
    pub route_ms: Option<u64>,
    pub primary_ms: Option<u64>,
    pub tool_ms: Option<u64>,
    pub second_ms: Option<u64>,
    pub total_ms: u64,
}

/// What the pipeline decided, attached to every successful turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub strategy_tag: StrategyTag,
    pub strategy_text: String,
    pub intent: String,
    pub emotion: String,
    pub is_sensitive: bool,
    pub classifier_model: Option<String>,
    pub classifier_fallback: bool,
    pub classifier_error: Option<String>,
    /// Classifier's tool suggestion. Recorded only, never executed.
    pub direct_tool: Option<DirectTool>,
    pub router_model: Option<String>,
    pub router_error: Option<String>,
    /// The router picked the tool and the first primary call was skipped.
    pub fast_track: bool,
    pub tool_invoked: Option<String>,
    pub tool_result: Option<String>,
    /// Persona the primary model saw, or would have seen on a scripted path.
    pub persona_preview: String,
    pub persona_hash: String,
    pub available_tasks: Vec<String>,
    pub completed_this_turn: Vec<String>,
    pub timings: StageTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serialization() {
        let json = serde_json::to_string(&StrategyTag::SensitiveFallback).unwrap();
        assert_eq!(json, r#""SENSITIVE_FALLBACK""#);
        assert_eq!(StrategyTag::default(), StrategyTag::NoStrategy);

        let value = serde_json::to_value(Diagnostics::default()).unwrap();
        assert_eq!(value["strategy_tag"], "NO_STRATEGY");
        assert!(value["timings"]["tool_ms"].is_null());
        assert_eq!(value["fast_track"], false);

        let json = serde_json::to_string(&StrategyTag::ToolFallback).unwrap();
        assert_eq!(json, r#""TOOL_FALLBACK""#);
    }
}
