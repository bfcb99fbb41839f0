//! Mobile plan catalog tools.
//!
//! Three tools share one [`PlanCatalog`]: listing all plans, fetching one plan's
//! details, and comparing two plans side by side. Names are resolved by alias
//! first, then by exact plan name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::tool::{string_params, Tool, ToolArgs, ToolOutput};

/// A mobile plan offered to customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_name: String,
    pub description: String,
    /// Free-form plan data: monthly fee, data, minutes, ...
    #[serde(default)]
    pub details_json: Map<String, Value>,
    /// Alternative names customers use for the plan.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// In-memory plan catalog.
#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    /// Load a catalog from a JSON array of plans.
    pub fn from_json(json: &str) -> Result<Self, ToolError> {
        let plans: Vec<Plan> = serde_json::from_str(json)?;
        Ok(Self::new(plans))
    }

    /// A small catalog for demos and tests.
    pub fn builtin() -> Self {
        let plan = |name: &str, description: &str, aliases: &[&str], details: Value| Plan {
            plan_name: name.to_string(),
            description: description.to_string(),
            details_json: details.as_object().cloned().unwrap_or_default(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        };

        Self::new(vec![
            plan(
                "畅享59元套餐",
                "基础畅享套餐，适合日常使用",
                &["用户原套餐", "59套餐"],
                serde_json::json!({"月租": 59, "通用流量": "30GB", "通话": "200分钟"}),
            ),
            plan(
                "畅享99元套餐",
                "升档套餐，流量和通话翻倍",
                &["升档新套餐", "99套餐"],
                serde_json::json!({"月租": 99, "通用流量": "80GB", "通话": "500分钟", "赠送": "视频会员"}),
            ),
            plan(
                "5G尊享199元套餐",
                "高端5G套餐，不限量体验",
                &["尊享套餐"],
                serde_json::json!({"月租": 199, "通用流量": "200GB", "通话": "1500分钟", "宽带": "千兆"}),
            ),
        ])
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Find a plan by alias, then by name.
    pub fn find(&self, name: &str) -> Option<&Plan> {
        let name = name.trim();
        self.plans
            .iter()
            .find(|p| p.aliases.iter().any(|a| a == name))
            .or_else(|| self.plans.iter().find(|p| p.plan_name == name))
    }
}

/// `queryAllPlans`: list every plan.
pub struct QueryAllPlans {
    catalog: Arc<PlanCatalog>,
}

impl QueryAllPlans {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for QueryAllPlans {
    fn name(&self) -> &str {
        "queryAllPlans"
    }

    fn description(&self) -> &str {
        "当用户第一次询问有什么套餐，或者想了解所有套餐选择时，必须调用此工具。"
    }

    async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
        debug!("Listing {} plans", self.catalog.plans().len());
        ToolOutput::json(&self.catalog.plans())
    }
}

/// `getPlanDetails`: one plan's data.
pub struct GetPlanDetails {
    catalog: Arc<PlanCatalog>,
}

impl GetPlanDetails {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for GetPlanDetails {
    fn name(&self) -> &str {
        "getPlanDetails"
    }

    fn description(&self) -> &str {
        "当用户询问某个具体套餐的详细信息时，调用此工具获取该套餐的月租、流量、通话等数据。"
    }

    fn parameters(&self) -> Value {
        string_params(&[("planName", "需要查询详情的套餐的完整名称")])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let name = args.get_string("planName")?;
        match self.catalog.find(&name) {
            Some(plan) => ToolOutput::json(plan),
            None => Err(ToolError::NotFoundData(format!("未找到套餐: {}", name))),
        }
    }
}

/// `compareTwoPlans`: both plans' data keyed by canonical plan name.
pub struct CompareTwoPlans {
    catalog: Arc<PlanCatalog>,
}

impl CompareTwoPlans {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for CompareTwoPlans {
    fn name(&self) -> &str {
        "compareTwoPlans"
    }

    fn description(&self) -> &str {
        "当用户明确表示想要比较两个套餐时，或者在对话中提到了两个具体的套餐名并想知道它们的区别时，调用此工具。\
         你需要从对话中准确提取两个套餐的完整名称作为参数，例如 '用户原套餐' 和 '升档新套餐'。\
         工具会返回这两个套餐的详细数据，你需要基于这些数据，用口语化的方式为用户进行对比和总结。"
    }

    fn parameters(&self) -> Value {
        string_params(&[
            ("planName1", "第一个套餐的完整名称"),
            ("planName2", "第二个套餐的完整名称"),
        ])
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let first = args.get_string("planName1")?;
        let second = args.get_string("planName2")?;

        let mut found = BTreeMap::new();
        for name in [&first, &second] {
            match self.catalog.find(name) {
                Some(plan) => {
                    found.insert(plan.plan_name.clone(), plan);
                }
                None => warn!("Plan not found for comparison: {}", name),
            }
        }

        if found.is_empty() {
            return Err(ToolError::NotFoundData("无法比较套餐".to_string()));
        }
        ToolOutput::json(&found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        let mut params = Map::new();
        for (k, v) in pairs {
            params.insert(k.to_string(), Value::String(v.to_string()));
        }
        ToolArgs::new(params)
    }

    #[test]
    fn test_find_prefers_alias() {
        let catalog = PlanCatalog::builtin();
        assert_eq!(catalog.find("升档新套餐").unwrap().plan_name, "畅享99元套餐");
        assert_eq!(catalog.find("畅享59元套餐").unwrap().plan_name, "畅享59元套餐");
        assert!(catalog.find("不存在").is_none());
    }

    #[test]
    fn test_from_json() {
        let catalog = PlanCatalog::from_json(
            r#"[{"planName": "A", "description": "a", "detailsJson": {"月租": 1}}]"#,
        )
        .unwrap();
        assert_eq!(catalog.plans().len(), 1);
        assert!(catalog.plans()[0].aliases.is_empty());
    }

    #[tokio::test]
    async fn test_compare_returns_both_plans() {
        let tool = CompareTwoPlans::new(Arc::new(PlanCatalog::builtin()));
        let output = tool
            .execute(args(&[("planName1", "用户原套餐"), ("planName2", "升档新套餐")]))
            .await
            .unwrap();

        let value: Value = serde_json::from_str(&output.content).unwrap();
        assert_eq!(value["畅享59元套餐"]["detailsJson"]["月租"], 59);
        assert_eq!(value["畅享99元套餐"]["detailsJson"]["月租"], 99);
    }

    #[tokio::test]
    async fn test_compare_with_no_matches_fails() {
        let tool = CompareTwoPlans::new(Arc::new(PlanCatalog::builtin()));
        let result = tool
            .execute(args(&[("planName1", "x"), ("planName2", "y")]))
            .await;
        assert!(matches!(result, Err(ToolError::NotFoundData(_))));
    }

    #[tokio::test]
    async fn test_query_all_lists_catalog() {
        let tool = QueryAllPlans::new(Arc::new(PlanCatalog::builtin()));
        let output = tool.execute(ToolArgs::default()).await.unwrap();
        let value: Vec<Plan> = serde_json::from_str(&output.content).unwrap();
        assert_eq!(value.len(), 3);
    }
}
