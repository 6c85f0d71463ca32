//! react-agent - a console agent that answers questions by reasoning in JSON
//! envelopes and calling tools.
//!
//! Each question runs a loop of model requests, tool calls and observations
//! until the model produces an `output` envelope.

mod config;
mod console;
mod conversation;
mod error;
mod llm;
mod protocol;
mod runtime;
mod state_machine;
mod system_prompt;
mod tools;

use config::AgentConfig;
use conversation::Conversation;
use llm::{LoggingService, OpenAIService};
use runtime::AgentRuntime;
use std::sync::Arc;
use system_prompt::build_system_prompt;
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with answers
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "react_agent=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Process environment wins over .env
    if let Some(path) = config::load_dotenv()? {
        tracing::info!(path = %path.display(), "Loaded .env");
    }
    let config = AgentConfig::from_env()?;

    if config.llm.api_key.is_none() {
        tracing::warn!("TOGETHER_API_KEY not set, model requests will be rejected");
    }
    if config.weather.api_key.is_none() {
        tracing::warn!("WEATHER_API_KEY not set, weather lookups will fail");
    }

    let service = OpenAIService::new(&config.llm)?;
    let llm = LoggingService::new(Arc::new(service));
    tracing::info!(model = %config.llm.model, base_url = %config.llm.base_url, "Model configured");

    let tools = ToolRegistry::standard(&config.weather)?;
    let conversation = Conversation::new(build_system_prompt(&tools.definitions()));
    tracing::debug!(
        tools = ?tools.names(),
        prompt_chars = conversation.system_prompt().len(),
        "System prompt built"
    );

    let mut runtime = AgentRuntime::new(llm, tools, conversation, config.limits)
        .with_json_mode(config.llm.json_mode);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let repl = console::run_repl(&mut runtime, stdin, tokio::io::stdout(), tokio::io::stderr());
    tokio::select! {
        result = repl => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }

    Ok(())
}
