//! # relay CLI
//!
//! Command-line interface for relay: tool-calling conversations and
//! structured output against OpenAI-compatible endpoints.
//!
//! ## Usage
//!
//! - `relay "question"` - Answer a question, calling the built-in tools as needed
//! - `relay tools` - Show available tools
//! - `relay decode "prompt"` - Ask for a structured JSON response

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{decode_command, run_command, tools_command, RunArgs};
use config::CliConfigLoader;

/// relay - Tool-calling conversations with an LLM
#[derive(Parser)]
#[command(name = "relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-turn tool calling and structured output for OpenAI-compatible models")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Protocol to use (openai, azure_openai)
    #[arg(long)]
    protocol: Option<String>,

    /// API key override
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// Azure API version override
    #[arg(long)]
    api_version: Option<String>,

    /// System prompt for the conversation
    #[arg(long)]
    system: Option<String>,

    /// Maximum number of model calls per query
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Ask for a final answer instead of failing when the round limit is hit
    #[arg(long)]
    final_answer_on_limit: bool,

    /// Overall deadline for the query in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Execute requested tool calls one at a time
    #[arg(long)]
    sequential: bool,

    /// Output trajectory file
    #[arg(long)]
    trajectory_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// The question to answer
    query: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available tools
    Tools,

    /// Decode a structured JSON response for a prompt
    Decode {
        /// Prompt describing what to generate
        prompt: String,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(protocol) = &cli.protocol {
        loader = loader.with_protocol_override(protocol.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    if let Some(api_version) = &cli.api_version {
        loader = loader.with_api_version_override(api_version.clone());
    }

    loader
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    relay_core::init_tracing_with_debug(cli.verbose);

    let config_loader = build_config_loader(&cli);

    match (cli.query, cli.command) {
        (Some(query), None) => {
            let args = RunArgs {
                system_prompt: cli.system,
                max_rounds: cli.max_rounds,
                final_answer_on_limit: cli.final_answer_on_limit,
                timeout_secs: cli.timeout,
                sequential: cli.sequential,
                trajectory_file: cli.trajectory_file,
            };
            run_command(query, config_loader, args).await
        }
        (Some(_), Some(_)) => {
            tracing::error!("Error: Cannot specify both a query and a subcommand");
            std::process::exit(2);
        }
        (None, Some(Commands::Tools)) => tools_command().await,
        (None, Some(Commands::Decode { prompt })) => decode_command(prompt, config_loader).await,
        (None, None) => {
            eprintln!("Nothing to do. Pass a question, or run `relay --help`.");
            std::process::exit(2);
        }
    }
}
