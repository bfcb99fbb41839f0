//! Talk to the customer-service agent from a terminal.
//!
//! Run with: cargo run -p orchestrator --example console_agent
//!
//! Type a message and press enter. Special inputs:
//!   /reset    archive the conversation and start over
//!   /silence  send a silence signal
//!   /tasks    show workflow status
//!   /quit     archive the conversation and exit
//!
//! Environment (see .env):
//!   QWEN_API_KEY / DOUBAO_API_KEY  - at least one provider key
//!   AGENT_*                        - agent configuration, see StaticConfigSource::from_env
//!   AGENT_ARCHIVE_DIR              - where conversations are archived (default: chat_logs)

use std::env;
use std::sync::Arc;

use agent_tools::{default_registry, RegistryToolExecutor};
use brain_core::{ChatBrain, ModelGateway};
use compat_brain::{CompatBrain, Provider};
use orchestrator::{MarkdownArchive, Orchestrator, StaticConfigSource, SILENCE_SIGNAL};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const SESSION: &str = "console";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut adapters: Vec<Arc<dyn ChatBrain>> = Vec::new();
    for provider in [Provider::Qwen, Provider::Doubao] {
        match CompatBrain::from_env(provider) {
            Ok(brain) => adapters.push(Arc::new(brain)),
            Err(e) => warn!("{} adapter disabled: {}", provider.name(), e),
        }
    }
    if adapters.is_empty() {
        return Err("set QWEN_API_KEY or DOUBAO_API_KEY".into());
    }

    let gateway = Arc::new(ModelGateway::new(adapters)?);
    let config = Arc::new(StaticConfigSource::from_env()?);
    let archive_dir = env::var("AGENT_ARCHIVE_DIR").unwrap_or_else(|_| "chat_logs".to_string());

    let orchestrator = Orchestrator::new(
        config,
        gateway,
        Arc::new(RegistryToolExecutor::new(default_registry())),
    )
    .with_archive(Arc::new(MarkdownArchive::new(&archive_dir)));

    println!("=== Customer Service Agent ===");
    println!("Commands: /reset /silence /tasks /quit\n");
    println!("Agent: {}\n", orchestrator.opening_line().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                match orchestrator.reset(SESSION).await? {
                    Some(path) => println!("[archived to {}]", path.display()),
                    None => println!("[nothing to archive]"),
                }
                println!("Agent: {}\n", orchestrator.opening_line().await);
                continue;
            }
            "/tasks" => {
                match orchestrator.workflow_snapshot(SESSION).await {
                    Some(tasks) => {
                        for task in tasks {
                            let mark = if task.available { "→" } else { " " };
                            println!("  {} {:?} {}", mark, task.status, task.name);
                        }
                    }
                    None => println!("  (no session yet)"),
                }
                println!();
                continue;
            }
            _ => {}
        }

        let utterance = if input == "/silence" { SILENCE_SIGNAL } else { input };
        match orchestrator.handle_turn(SESSION, utterance).await {
            Ok(turn) => {
                println!("Agent: {}", turn.reply);
                println!(
                    "  [{:?} | intent: {} | emotion: {} | {}ms]\n",
                    turn.diagnostics.strategy_tag,
                    turn.diagnostics.intent,
                    turn.diagnostics.emotion,
                    turn.diagnostics.timings.total_ms
                );
            }
            Err(e) => println!("[error: {}]\n", e),
        }
    }

    if let Some(path) = orchestrator.save_on_exit(SESSION).await? {
        println!("[archived to {}]", path.display());
    }
    println!("Goodbye!");
    Ok(())
}
