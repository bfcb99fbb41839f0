//! Fast-track router: a cheap model picks a simple data tool for the utterance.
//!
//! When it does, the turn skips the first primary call. The tool runs and the
//! primary model only phrases the result. Like the classifier, the router
//! never fails the turn: any problem is a miss and the normal path runs.

use std::sync::Arc;
use std::time::Instant;

use brain_core::{ChatRequest, ModelGateway, ModelParameters, ToolDefinition, ToolRequest};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{parse_classification, DirectTool};

/// Tools the router may pick. Anything else goes through the primary model.
pub const FAST_TRACK_TOOLS: &[&str] = &[
    "getWeather",
    "getOilPrice",
    "getGoldPrice",
    "getNews",
    "getExchangeRate",
    "getFundInfo",
    "getCurrentTimeByCity",
    "getStockInfo",
];

const TOOLS_PLACEHOLDER: &str = "{tools}";

/// Numbered listing of `definitions` with their parameters.
///
/// ```text
/// 1. getWeather: 查询天气
///    - city (必填): 城市名称
/// ```
pub fn tool_listing(definitions: &[ToolDefinition]) -> String {
    let mut listing = String::new();
    for (index, definition) in definitions.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {}: {}\n",
            index + 1,
            definition.name(),
            definition.function.description
        ));

        let parameters = &definition.function.parameters;
        let required: Vec<&str> = parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let mut properties: Vec<(&String, &Value)> = parameters["properties"]
            .as_object()
            .map(|props| props.iter().collect())
            .unwrap_or_default();
        properties.sort_by(|a, b| a.0.cmp(b.0));

        if properties.is_empty() {
            listing.push_str("   - (无参数)\n");
        }
        for (name, schema) in properties {
            let kind = if required.contains(&name.as_str()) { "必填" } else { "选填" };
            let description = schema["description"].as_str().unwrap_or_default();
            listing.push_str(&format!("   - {} ({}): {}\n", name, kind, description));
        }
    }
    listing
}

/// Fill `{tools}` in `template` with the listing of `definitions`.
pub fn render_router_prompt(template: &str, definitions: &[ToolDefinition]) -> String {
    template.replace(TOOLS_PLACEHOLDER, &tool_listing(definitions))
}

/// What the router decided.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// Tool to run, already checked against the offered tools.
    pub tool: Option<DirectTool>,
    /// Model asked, or `None` when no call was made.
    pub model_used: Option<String>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl RouteOutcome {
    fn miss(started: Instant, model_used: Option<String>, error: Option<String>) -> Self {
        Self {
            tool: None,
            model_used,
            error,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Runs router calls through the model gateway.
#[derive(Debug, Clone)]
pub struct Router {
    gateway: Arc<ModelGateway>,
}

impl Router {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Ask the router model whether one of the offered fast-track tools answers `utterance`.
    ///
    /// Makes no call when none of `offered` is a fast-track tool or when no
    /// adapter serves the router model. The call runs in a throwaway session.
    pub async fn route(
        &self,
        utterance: &str,
        template: &str,
        params: &ModelParameters,
        offered: &[ToolDefinition],
    ) -> RouteOutcome {
        let started = Instant::now();

        let candidates: Vec<ToolDefinition> = offered
            .iter()
            .filter(|def| FAST_TRACK_TOOLS.contains(&def.name()))
            .cloned()
            .collect();
        if candidates.is_empty() {
            debug!("No fast-track tools on offer, skipping router");
            return RouteOutcome::miss(started, None, None);
        }

        if !self.gateway.supports(&params.model_name) {
            warn!(model = %params.model_name, "Router model unavailable, skipping fast track");
            return RouteOutcome::miss(started, None, Some("router model unavailable".to_string()));
        }
        let model_used = Some(params.model_name.clone());

        let session_id = format!("router-{}", Uuid::new_v4());
        let request = ChatRequest {
            session_id: session_id.clone(),
            user_text: format!("{}{}", render_router_prompt(template, &candidates), utterance),
            system_prompt: String::new(),
            opening_line: None,
            params: params.clone(),
            tools: Vec::new(),
        };

        let reply = self.gateway.chat(request).await;
        self.gateway.pop_history(&session_id).await;

        let text = match reply {
            Ok(reply) => reply.text,
            Err(e) => {
                warn!(model = %params.model_name, "Router call failed: {}", e);
                return RouteOutcome::miss(started, model_used, Some(e.to_string()));
            }
        };

        let suggestion = match parse_classification(&text) {
            Ok(parsed) => parsed.direct_tool,
            Err(e) => {
                warn!("Failed to parse router output: {}", e);
                debug!("Router output was: {}", text);
                return RouteOutcome::miss(started, model_used, Some(e));
            }
        };

        let tool = suggestion.filter(|tool| {
            if !candidates.iter().any(|def| def.name() == tool.name) {
                debug!(tool = %tool.name, "Router picked a tool that is not on the fast track");
                return false;
            }
            if let Err(e) = ToolRequest::from_call("router", &tool.name, &tool.arguments) {
                debug!(tool = %tool.name, "Router produced unusable arguments: {}", e);
                return false;
            }
            true
        });

        let outcome = RouteOutcome {
            tool,
            model_used,
            error: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            tool = outcome.tool.as_ref().map(|t| t.name.as_str()).unwrap_or("-"),
            elapsed_ms = outcome.elapsed_ms,
            "Routed utterance"
        );
        outcome
    }
}
