//! Exercise every built-in tool through the registry executor.
//!
//! Run with: cargo run -p agent-tools --example test_tools

use agent_tools::{default_registry, RegistryToolExecutor};
use brain_core::{ToolExecutor, ToolRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agent_tools=debug".parse()?),
        )
        .init();

    println!("=== Agent Tools Crate Test ===\n");

    let executor = RegistryToolExecutor::new(default_registry());

    println!("Registered tools:");
    for definition in executor.definitions() {
        println!("  - {}: {}", definition.name(), definition.function.description);
    }
    println!();

    let calls = [
        ("queryAllPlans", "{}"),
        ("getPlanDetails", r#"{"planName": "升档新套餐"}"#),
        ("compareTwoPlans", r#"{"planName1": "用户原套餐", "planName2": "升档新套餐"}"#),
        ("queryMcpFaq", r#"{"intent": "流量超额"}"#),
        ("queryMcpFaq", r#"{"intent": ""}"#),
        // Network
        ("getWeather", r#"{"city": "北京"}"#),
        ("getCurrentTimeByCity", r#"{"city": "上海"}"#),
        // Network, ALIYUN_MARKET_APPCODE
        ("getOilPrice", r#"{"province": "广东"}"#),
        ("getGoldPrice", "{}"),
        ("getExchangeRate", r#"{"currency": "USD"}"#),
        // Network, DASHSCOPE_API_KEY
        ("webSearch", r#"{"query": "今日科技新闻", "count": 3}"#),
        ("noSuchTool", "{}"),
    ];

    for (index, (name, arguments)) in calls.iter().enumerate() {
        let request = ToolRequest::from_call(format!("call_{}", index), *name, arguments)?;
        let result = executor.execute(request).await;
        let status = if result.success { "OK" } else { "ERR" };
        println!("  [{}] {} => {}", status, name, result.content);
    }

    println!("\n=== All tests completed ===");
    Ok(())
}
