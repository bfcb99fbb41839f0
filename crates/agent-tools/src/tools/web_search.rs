//! Web search through the DashScope search service.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

const SEARCH_URL: &str = "https://dashscope.aliyuncs.com/api/v1/mcps/webSearch/sse";
const SEARCH_MODEL: &str = "jisu-search.internet";

/// Results requested when the model gives no count.
pub const DEFAULT_RESULT_COUNT: u64 = 5;
const MAX_RESULT_COUNT: u64 = 10;

/// What the model receives.
#[derive(Debug, Serialize, PartialEq)]
pub struct SearchResult {
    pub query: String,
    pub results: String,
}

/// `webSearch`: search the internet for recent information.
///
/// Authenticates with `DASHSCOPE_API_KEY`, or `QWEN_API_KEY` when that is unset.
pub struct WebSearch {
    client: reqwest::Client,
    api_key: Option<String>,
    url: String,
}

impl WebSearch {
    pub fn new(api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            url: SEARCH_URL.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let key = env::var("DASHSCOPE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| env::var("QWEN_API_KEY").ok());
        Self::new(key)
    }

    /// Send searches to another endpoint speaking the same stream format.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl Default for WebSearch {
    fn default() -> Self {
        Self::from_env()
    }
}

fn result_count(args: &ToolArgs) -> u64 {
    let raw = match args.params.get("count") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    raw.unwrap_or(DEFAULT_RESULT_COUNT).clamp(1, MAX_RESULT_COUNT)
}

/// Concatenate the `output.text` pieces of an event stream body.
///
/// Only `data:` lines count; `[DONE]` and blank payloads are skipped. A payload
/// carrying `code` or `message` is an error from the service.
pub(crate) fn parse_sse_text(body: &str) -> Result<String, ToolError> {
    let mut text = String::new();

    for line in body.lines() {
        let Some(data) = line.strip_prefix("data:").map(str::trim) else {
            continue;
        };
        if data.is_empty() || data.eq_ignore_ascii_case("[DONE]") {
            continue;
        }

        let event: Value = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                debug!("Skipping unparsable search event: {}", e);
                continue;
            }
        };
        if event.get("code").is_some() || event.get("message").is_some() {
            return Err(ToolError::ExecutionFailed(format!("search service error: {}", data)));
        }
        if let Some(piece) = event.pointer("/output/text").and_then(Value::as_str) {
            text.push_str(piece);
        }
    }

    if text.trim().is_empty() {
        return Err(ToolError::NotFoundData("搜索没有返回任何内容".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "webSearch"
    }

    fn description(&self) -> &str {
        "当用户的问题需要最新的互联网信息，而其他工具都无法回答时，调用此工具联网搜索。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "搜索关键词" },
                "count": { "type": "integer", "description": "返回结果条数，1到10，默认5" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let query = args.get_string("query")?;
        let count = result_count(&args);
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ToolError::ExecutionFailed("web search is not configured (set DASHSCOPE_API_KEY)".to_string())
        })?;

        debug!(count, "Searching the web for: {}", query);
        let body = json!({
            "model": SEARCH_MODEL,
            "input": { "parameters": { "query": query, "count": count } },
            "stream": true,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            warn!("Search API returned status {}", response.status());
            return Err(ToolError::ExecutionFailed(format!(
                "Search API returned status {}",
                response.status()
            )));
        }

        let results = parse_sse_text(&response.text().await?)?;
        ToolOutput::json(&SearchResult { query, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_parse_sse_concatenates_text() {
        let body = "event: result\n\
                    data: {\"output\": {\"text\": \"第一段，\"}}\n\n\
                    data: {\"output\": {\"text\": \"第二段\"}}\n\
                    data: not json\n\
                    data: [DONE]\n";
        assert_eq!(parse_sse_text(body).unwrap(), "第一段，第二段");
    }

    #[test]
    fn test_parse_sse_service_error() {
        let body = "data: {\"code\": \"InvalidApiKey\", \"message\": \"bad key\"}\n";
        let result = parse_sse_text(body);
        assert!(matches!(result, Err(ToolError::ExecutionFailed(msg)) if msg.contains("InvalidApiKey")));
    }

    #[test]
    fn test_parse_sse_empty_stream() {
        assert!(matches!(parse_sse_text("data: [DONE]\n"), Err(ToolError::NotFoundData(_))));
    }

    #[test]
    fn test_result_count_defaults_and_clamps() {
        let mut params = Map::new();
        assert_eq!(result_count(&ToolArgs::new(params.clone())), DEFAULT_RESULT_COUNT);

        params.insert("count".to_string(), Value::from(50));
        assert_eq!(result_count(&ToolArgs::new(params.clone())), MAX_RESULT_COUNT);

        params.insert("count".to_string(), Value::String("3".to_string()));
        assert_eq!(result_count(&ToolArgs::new(params)), 3);
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let mut params = Map::new();
        params.insert("query".to_string(), Value::String("今日新闻".to_string()));

        let result = WebSearch::new(None).execute(ToolArgs::new(params)).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed(msg)) if msg.contains("not configured")));
    }
}
