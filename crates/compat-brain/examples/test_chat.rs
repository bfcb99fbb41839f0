//! Simple test for a CompatBrain chat completion.
//!
//! Run with: cargo run -p compat-brain --example test_chat
//! Or with a model and message: cargo run -p compat-brain --example test_chat -- doubao-pro-32k "你好"
//!
//! Make sure to set environment variables in .env:
//!   QWEN_API_KEY   - DashScope API key (for qwen* models)
//!   DOUBAO_API_KEY - Ark API key (for doubao*/ep-* models)

use brain_core::{ChatBrain, ChatRequest, ModelParameters};
use compat_brain::{CompatBrain, Provider};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let model = args.get(1).cloned().unwrap_or_else(|| "qwen-turbo".to_string());
    let message_text = if args.len() > 2 {
        args[2..].join(" ")
    } else {
        "你好！请用一句话介绍你自己。".to_string()
    };

    let provider = if model.starts_with("qwen") {
        Provider::Qwen
    } else {
        Provider::Doubao
    };

    println!("Initializing CompatBrain for {}...", provider.name());
    let brain = CompatBrain::from_env(provider)?;
    println!("Brain initialized: {}", brain.name());
    println!("API URL: {}", brain.config().api_url);
    println!("Model: {}", model);
    println!();

    println!("Sending: \"{}\"", message_text);
    println!("Waiting for response...\n");

    let reply = brain
        .chat(ChatRequest {
            session_id: "example".to_string(),
            user_text: message_text,
            system_prompt: "你是一名耐心的电信客服。".to_string(),
            opening_line: None,
            params: ModelParameters::new(model),
            tools: Vec::new(),
        })
        .await?;

    println!("=== Response ===");
    println!("{}", reply.text);
    println!("================");

    Ok(())
}
