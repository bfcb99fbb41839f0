//! Classifier stage: intent, emotion and sensitivity from a cheap model.
//!
//! Never fails the turn. Transport and parse failures degrade to
//! [`ClassificationResult::default`] and are reported in the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use brain_core::{ChatRequest, ModelGateway, ModelParameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_INTENT: &str = "unknown";
pub const DEFAULT_EMOTION: &str = "neutral";

/// Tool the classifier thinks answers the utterance directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectTool {
    pub name: String,
    pub arguments: String,
}

/// Labels for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub intent: String,
    pub emotion: String,
    pub is_sensitive: bool,
    pub direct_tool: Option<DirectTool>,
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            intent: DEFAULT_INTENT.to_string(),
            emotion: DEFAULT_EMOTION.to_string(),
            is_sensitive: false,
            direct_tool: None,
        }
    }
}

/// Why classification degraded to the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ClassifierFailure {
    Parse(String),
    Call(String),
}

impl ClassifierFailure {
    /// Intent label reported in diagnostics for this failure.
    pub fn intent_label(&self) -> &'static str {
        match self {
            ClassifierFailure::Parse(_) => "unknown (parse failed)",
            ClassifierFailure::Call(_) => "unknown (call failed)",
        }
    }
}

impl fmt::Display for ClassifierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierFailure::Parse(detail) => write!(f, "parse failed: {}", detail),
            ClassifierFailure::Call(detail) => write!(f, "call failed: {}", detail),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierOutcome {
    pub result: ClassificationResult,
    /// Model that actually served the call.
    pub model_used: String,
    /// The classifier model had no adapter and the primary model stood in.
    pub fell_back: bool,
    pub error: Option<ClassifierFailure>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default, alias = "isSensitive")]
    is_sensitive: Option<Value>,
    #[serde(default, alias = "toolName")]
    tool_name: Option<String>,
    #[serde(default, alias = "toolArgs")]
    tool_args: Option<Value>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn truthy(value: Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1" | "是"),
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

/// Parse classifier output.
///
/// Takes the text between the first `{` and the last `}`, so code fences and
/// chatter around the object are ignored. Missing fields take their defaults.
pub fn parse_classification(text: &str) -> Result<ClassificationResult, String> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err("no JSON object in classifier output".to_string());
    };
    if end < start {
        return Err("no JSON object in classifier output".to_string());
    }

    let raw: RawClassification =
        serde_json::from_str(&text[start..=end]).map_err(|e| e.to_string())?;

    let direct_tool = non_blank(raw.tool_name).map(|name| DirectTool {
        name,
        arguments: match raw.tool_args {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    });

    Ok(ClassificationResult {
        intent: non_blank(raw.intent).unwrap_or_else(|| DEFAULT_INTENT.to_string()),
        emotion: non_blank(raw.emotion).unwrap_or_else(|| DEFAULT_EMOTION.to_string()),
        is_sensitive: truthy(raw.is_sensitive),
        direct_tool,
    })
}

/// Runs classification calls through the model gateway.
#[derive(Debug, Clone)]
pub struct Classifier {
    gateway: Arc<ModelGateway>,
}

impl Classifier {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Classify `utterance` with `template` prepended.
    ///
    /// Runs in a throwaway session whose history is discarded whatever the
    /// outcome. Falls back to `primary` when no adapter serves `classifier`.
    pub async fn classify(
        &self,
        utterance: &str,
        template: &str,
        classifier: &ModelParameters,
        primary: &ModelParameters,
    ) -> ClassifierOutcome {
        let started = Instant::now();

        let (params, fell_back) = if self.gateway.supports(&classifier.model_name) {
            (classifier.clone(), false)
        } else {
            warn!(
                model = %classifier.model_name,
                fallback = %primary.model_name,
                "Classifier model unavailable, using primary model"
            );
            (primary.clone(), true)
        };
        let model_used = params.model_name.clone();

        let session_id = format!("classifier-{}", Uuid::new_v4());
        let request = ChatRequest {
            session_id: session_id.clone(),
            user_text: format!("{}{}", template, utterance),
            system_prompt: String::new(),
            opening_line: None,
            params,
            tools: Vec::new(),
        };

        let reply = self.gateway.chat(request).await;
        self.gateway.pop_history(&session_id).await;

        let (result, error) = match reply {
            Ok(reply) => match parse_classification(&reply.text) {
                Ok(result) => (result, None),
                Err(e) => {
                    warn!("Failed to parse classifier output: {}", e);
                    debug!("Classifier output was: {}", reply.text);
                    (ClassificationResult::default(), Some(ClassifierFailure::Parse(e)))
                }
            },
            Err(e) => {
                warn!(model = %model_used, "Classifier call failed: {}", e);
                (ClassificationResult::default(), Some(ClassifierFailure::Call(e.to_string())))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            intent = %result.intent,
            emotion = %result.emotion,
            sensitive = result.is_sensitive,
            model = %model_used,
            elapsed_ms,
            "Classified utterance"
        );

        ClassifierOutcome {
            result,
            model_used,
            fell_back,
            error,
            elapsed_ms,
        }
    }
}
