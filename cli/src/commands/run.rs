//! Single query execution command

use anyhow::{anyhow, Result};
use colored::Colorize;
use relay_core::error::OrchestrationError;
use relay_core::llm::ChatOptions;
use relay_core::orchestration::PartialTrace;
use relay_core::tools::builtin_registry;
use relay_core::{create_client, LimitPolicy, Orchestrator, QueryOptions, TrajectoryRecorder};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to various tools. \
Use the tools when needed to provide accurate and helpful responses.";

/// Query options taken from the command line
#[derive(Debug, Default)]
pub struct RunArgs {
    pub system_prompt: Option<String>,
    pub max_rounds: Option<usize>,
    pub final_answer_on_limit: bool,
    pub timeout_secs: Option<u64>,
    pub sequential: bool,
    pub trajectory_file: Option<PathBuf>,
}

/// Answer a single query
pub async fn run_command(
    query: String,
    config_loader: crate::config::CliConfigLoader,
    args: RunArgs,
) -> Result<()> {
    info!("Executing query: {}", query);

    let llm_config = config_loader.load().await?;
    info!("Using protocol: {}", llm_config.protocol.as_str());
    info!("Using model: {}", llm_config.model);

    let client = create_client(&llm_config)?;

    let mut builder = Orchestrator::builder(client)
        .with_registry(builtin_registry()?)
        .with_chat_options(ChatOptions::from(&llm_config.params))
        .with_system_prompt(
            args.system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        );
    if let Some(max_rounds) = args.max_rounds {
        builder = builder.with_max_rounds(max_rounds);
    }
    if args.final_answer_on_limit {
        builder = builder.with_limit_policy(LimitPolicy::FinalAnswer);
    }
    if args.sequential {
        builder = builder.sequential_tools();
    }
    if let Some(trajectory_file) = &args.trajectory_file {
        info!("Trajectory file: {}", trajectory_file.display());
        builder = builder.with_trajectory_recorder(Arc::new(TrajectoryRecorder::with_file(
            trajectory_file,
        )));
    }
    let orchestrator = builder.build();

    let mut options = QueryOptions::new();
    if let Some(secs) = args.timeout_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    // Ctrl-C cancels the query and reports what was done so far
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling query");
            signal_token.cancel();
        }
    });

    let outcome = orchestrator
        .process_query_with_cancel(&query, options, cancel)
        .await;

    match outcome {
        Ok(result) => {
            println!("{}", result.final_response);
            eprintln!();
            let summary = format!(
                "{} round(s), {} tool call(s), {} tokens, {} ms",
                result.rounds,
                result.tool_call_count(),
                result.usage.total_tokens,
                result.duration_ms
            );
            eprintln!("{}", summary.dimmed());
            if result.max_rounds_reached {
                eprintln!(
                    "{}",
                    "Round limit reached; the answer was produced without further tool calls."
                        .yellow()
                );
            }
            Ok(())
        }
        Err(error) => {
            report_failure(&error);
            Err(anyhow!(error.kind))
        }
    }
}

fn report_failure(error: &OrchestrationError) {
    eprintln!("{} {}", "Query failed:".red().bold(), error.kind);
    print_trace(&error.trace);
}

fn print_trace(trace: &PartialTrace) {
    eprintln!(
        "{}",
        format!(
            "{} round(s) completed, {} tool call(s) executed",
            trace.rounds,
            trace.tool_results.len()
        )
        .dimmed()
    );
    for result in &trace.tool_results {
        match result.error() {
            None => eprintln!("  {} {} ({})", "✓".green(), result.tool_name, result.tool_call_id),
            Some(error) => eprintln!(
                "  {} {} ({}): {}",
                "✗".red(),
                result.tool_name,
                result.tool_call_id,
                error
            ),
        }
    }
}
