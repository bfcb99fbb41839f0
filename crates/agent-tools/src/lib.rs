//! Tools the customer-service agent can call.
//!
//! A [`Tool`] is one named capability with a JSON-schema argument object.
//! Tools live in a [`ToolRegistry`]; the [`RegistryToolExecutor`] exposes the
//! registry to the orchestrator as a `brain_core::ToolExecutor`, with an
//! optional [`ToolPolicy`] restricting which tools run and for how long.
//!
//! # Built-in Tools
//!
//! ## Plan catalog
//! - [`QueryAllPlans`] (`queryAllPlans`) lists every plan.
//! - [`GetPlanDetails`] (`getPlanDetails`) returns one plan.
//! - [`CompareTwoPlans`] (`compareTwoPlans`) returns two plans keyed by name.
//!
//! ## Service
//! - [`QueryFaq`] (`queryMcpFaq`) answers common questions by intent key.
//! - [`GetWeather`] (`getWeather`) via wttr.in.
//! - [`CurrentTimeByCity`] (`getCurrentTimeByCity`) via WorldTimeAPI.
//!
//! ## Market data
//! Need `ALIYUN_MARKET_APPCODE`, see [`MarketClient`].
//! - [`GetOilPrice`] (`getOilPrice`), [`GetGoldPrice`] (`getGoldPrice`)
//! - [`GetNews`] (`getNews`), [`GetExchangeRate`] (`getExchangeRate`)
//! - [`GetFundInfo`] (`getFundInfo`), [`GetStockInfo`] (`getStockInfo`)
//!
//! ## Search
//! - [`WebSearch`] (`webSearch`) via DashScope, needs `DASHSCOPE_API_KEY`.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_tools::default_registry;
//! use serde_json::{Map, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = default_registry();
//!
//!     let mut params = Map::new();
//!     params.insert("planName".to_string(), Value::String("升档新套餐".to_string()));
//!
//!     let result = registry.execute("getPlanDetails", params).await.unwrap();
//!     println!("{}", result.content);
//! }
//! ```

mod error;
mod executor;
mod registry;
mod tool;
pub mod tools;

use std::sync::Arc;

pub use error::ToolError;
pub use executor::{RegistryToolExecutor, ToolPolicy, TOOL_DISABLED, TOOL_TIMED_OUT, UNKNOWN_TOOL};
pub use registry::ToolRegistry;
pub use tool::{string_params, Tool, ToolArgs, ToolOutput};
pub use tools::{
    CompareTwoPlans, CurrentTimeByCity, FaqBook, GetExchangeRate, GetFundInfo, GetGoldPrice,
    GetNews, GetOilPrice, GetPlanDetails, GetStockInfo, GetWeather, MarketClient, Plan,
    PlanCatalog, QueryAllPlans, QueryFaq, WebSearch,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// Registry with the plan and FAQ tools over the given data, plus the data lookups.
///
/// Market tools share `market`; `search` backs `webSearch`.
pub fn customer_service_registry(
    catalog: PlanCatalog,
    faq: FaqBook,
    market: MarketClient,
    search: WebSearch,
) -> ToolRegistry {
    let catalog = Arc::new(catalog);
    let faq = Arc::new(faq);

    let mut registry = ToolRegistry::new();
    registry.register(QueryAllPlans::new(catalog.clone()));
    registry.register(GetPlanDetails::new(catalog.clone()));
    registry.register(CompareTwoPlans::new(catalog));
    registry.register(QueryFaq::new(faq));
    registry.register(GetWeather::new());
    registry.register(CurrentTimeByCity::new());
    registry.register(GetOilPrice::new(market.clone()));
    registry.register(GetGoldPrice::new(market.clone()));
    registry.register(GetNews::new(market.clone()));
    registry.register(GetExchangeRate::new(market.clone()));
    registry.register(GetFundInfo::new(market.clone()));
    registry.register(GetStockInfo::new(market));
    registry.register(search);
    registry
}

/// Create a new registry with all built-in tools over the built-in data.
///
/// Credentials for the market and search tools come from the environment.
pub fn default_registry() -> ToolRegistry {
    customer_service_registry(
        PlanCatalog::builtin(),
        FaqBook::builtin(),
        MarketClient::from_env(),
        WebSearch::from_env(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_order() {
        let registry = default_registry();
        assert_eq!(
            registry.list_tools(),
            vec![
                "queryAllPlans",
                "getPlanDetails",
                "compareTwoPlans",
                "queryMcpFaq",
                "getWeather",
                "getCurrentTimeByCity",
                "getOilPrice",
                "getGoldPrice",
                "getNews",
                "getExchangeRate",
                "getFundInfo",
                "getStockInfo",
                "webSearch",
            ]
        );
    }
}
