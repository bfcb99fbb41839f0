//! FAQ lookup by intent key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::tool::{string_params, Tool, ToolArgs, ToolOutput};

/// Canned answers keyed by intent.
#[derive(Debug, Clone, Default)]
pub struct FaqBook {
    answers: HashMap<String, String>,
}

impl FaqBook {
    pub fn new(answers: HashMap<String, String>) -> Self {
        Self { answers }
    }

    /// Load from a JSON object of `intent -> answer`.
    pub fn from_json(json: &str) -> Result<Self, ToolError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Answers for common service questions.
    pub fn builtin() -> Self {
        let answers = [
            ("查询话费", "您可以通过营业厅App首页的“话费查询”或发送短信 CXHF 到 10086 查询实时话费。"),
            ("流量超额", "套餐外流量按 5元/GB 计费，当月累计达到 60元 后自动限速，次月恢复。"),
            ("办理时间", "套餐变更次月1日生效，当月仍按原套餐计费。"),
            ("取消套餐", "您可以在营业厅App“已订业务”中退订，或拨打 10086 转人工办理。"),
        ];
        Self::new(
            answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn answer(&self, intent: &str) -> Option<&str> {
        self.answers.get(intent.trim()).map(String::as_str)
    }
}

#[derive(Serialize)]
struct FaqAnswer<'a> {
    intent: &'a str,
    answer: &'a str,
}

/// `queryMcpFaq`: answer a common question by its intent key.
pub struct QueryFaq {
    book: Arc<FaqBook>,
}

impl QueryFaq {
    pub fn new(book: Arc<FaqBook>) -> Self {
        Self { book }
    }
}

#[async_trait]
impl Tool for QueryFaq {
    fn name(&self) -> &str {
        "queryMcpFaq"
    }

    fn description(&self) -> &str {
        "当用户询问话费查询、流量超额、办理时间、取消套餐等常见问题时，调用此工具获取标准答案。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("intent", "用户的核心问题，例如 '查询话费' 或 '流量超额'")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let intent = args
            .get_string("intent")
            .map_err(|_| ToolError::NotFoundData("查询意图不能为空".to_string()))?;
        debug!("FAQ lookup for intent '{}'", intent);

        match self.book.answer(&intent) {
            Some(answer) => ToolOutput::json(&FaqAnswer {
                intent: &intent,
                answer,
            }),
            None => {
                warn!("No FAQ answer for intent '{}'", intent);
                Err(ToolError::NotFoundData(format!("未找到意图 '{}' 的答案", intent)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn args(intent: &str) -> ToolArgs {
        let mut params = Map::new();
        params.insert("intent".to_string(), Value::String(intent.to_string()));
        ToolArgs::new(params)
    }

    #[tokio::test]
    async fn test_known_intent() {
        let tool = QueryFaq::new(Arc::new(FaqBook::builtin()));
        let output = tool.execute(args("办理时间")).await.unwrap();
        let value: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(value["intent"], "办理时间");
        assert!(value["answer"].as_str().unwrap().contains("次月"));
    }

    #[tokio::test]
    async fn test_unknown_and_blank_intents() {
        let tool = QueryFaq::new(Arc::new(FaqBook::builtin()));
        assert!(tool.execute(args("天气")).await.is_err());

        let err = tool.execute(args(" ")).await.unwrap_err();
        assert_eq!(err.to_string(), "查询意图不能为空");
    }
}
