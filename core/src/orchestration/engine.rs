//! Orchestrator implementation
//!
//! One query runs as a sequence of rounds. Each round is one model call; when
//! the model asks for tools, the whole batch is executed and answered before
//! the next round starts.

use super::config::{LimitPolicy, OrchestratorBuilder, OrchestratorConfig, QueryOptions};
use super::result::{OrchestrationResult, PartialTrace};
use crate::error::{OrchestrationError, OrchestrationErrorKind};
use crate::llm::{ChatOptions, Conversation, LlmClient, LlmResponse, ModelReply, Usage};
use crate::tools::{ToolDefinition, ToolExecutor, ToolRegistry, ToolResult};
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type QueryResult = std::result::Result<OrchestrationResult, OrchestrationError>;

/// Tool-calling orchestration engine.
///
/// Cheap to share behind an `Arc`; every call to [`Orchestrator::process_query`]
/// owns its own conversation.
pub struct Orchestrator {
    client: Arc<dyn LlmClient>,
    executor: ToolExecutor,
    config: OrchestratorConfig,
    recorder: Option<Arc<TrajectoryRecorder>>,
}

/// Mutable state of one query
struct QueryState {
    id: String,
    conversation: Conversation,
    rounds: usize,
    tool_results: Vec<ToolResult>,
    usage: Usage,
    started: Instant,
}

impl QueryState {
    fn fail(self, kind: OrchestrationErrorKind) -> OrchestrationError {
        OrchestrationError::new(
            kind,
            PartialTrace {
                conversation: self.conversation,
                rounds: self.rounds,
                tool_results: self.tool_results,
                usage: self.usage,
            },
        )
    }

    fn finish(self, final_response: String, max_rounds_reached: bool) -> OrchestrationResult {
        OrchestrationResult {
            final_response,
            conversation: self.conversation,
            rounds: self.rounds,
            tool_results: self.tool_results,
            max_rounds_reached,
            usage: self.usage,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Cancels a token when the deadline passes; stops the timer when dropped
struct DeadlineGuard(Option<JoinHandle<()>>);

impl DeadlineGuard {
    fn start(deadline: Option<Duration>, token: &CancellationToken) -> Self {
        let handle = deadline.map(|deadline| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(deadline) => {
                        tracing::warn!("Query deadline of {:?} passed, cancelling", deadline);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            })
        });
        Self(handle)
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl Orchestrator {
    /// Start building an orchestrator around a model client
    pub fn builder(client: Arc<dyn LlmClient>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(client)
    }

    /// Create an orchestrator with default configuration
    pub fn new(client: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self::from_parts(client, registry, OrchestratorConfig::default(), None)
    }

    pub(crate) fn from_parts(
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: OrchestratorConfig,
        recorder: Option<Arc<TrajectoryRecorder>>,
    ) -> Self {
        let executor = ToolExecutor::with_config(registry, config.executor.clone());
        Self {
            client,
            executor,
            config,
            recorder,
        }
    }

    /// Configuration shared by every query
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Tools offered to the model
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    /// Attached trajectory recorder, if any
    pub fn trajectory_recorder(&self) -> Option<&Arc<TrajectoryRecorder>> {
        self.recorder.as_ref()
    }

    /// Run one query to completion
    pub async fn process_query(&self, user_message: &str, options: QueryOptions) -> QueryResult {
        self.process_query_with_cancel(user_message, options, CancellationToken::new())
            .await
    }

    /// Run one query; firing `cancel` stops the in-flight model call and tools
    pub async fn process_query_with_cancel(
        &self,
        user_message: &str,
        options: QueryOptions,
        cancel: CancellationToken,
    ) -> QueryResult {
        let token = cancel.child_token();
        let _deadline = DeadlineGuard::start(options.deadline, &token);

        let max_rounds = options.max_rounds.unwrap_or(self.config.max_rounds).max(1);
        let system_prompt = options
            .system_prompt
            .as_deref()
            .or(self.config.system_prompt.as_deref());

        let state = QueryState {
            id: Uuid::new_v4().to_string(),
            conversation: Conversation::seeded(system_prompt, user_message),
            rounds: 0,
            tool_results: Vec::new(),
            usage: Usage::default(),
            started: Instant::now(),
        };
        let query_id = state.id.clone();

        tracing::info!("Processing query {} (max {} rounds)", query_id, max_rounds);
        self.record(TrajectoryEntry::query_start(&query_id, user_message, max_rounds))
            .await;

        let outcome = self.run(state, max_rounds, &token).await;

        match &outcome {
            Ok(result) => {
                tracing::info!(
                    "Query {} completed in {} round(s) with {} tool call(s) ({}ms)",
                    query_id,
                    result.rounds,
                    result.tool_results.len(),
                    result.duration_ms
                );
                self.record(TrajectoryEntry::query_complete(
                    &query_id,
                    result.rounds,
                    Some(result.final_response.clone()),
                    None,
                ))
                .await;
            }
            Err(e) => {
                tracing::warn!("Query {} failed: {}", query_id, e);
                self.record(TrajectoryEntry::query_complete(
                    &query_id,
                    e.trace.rounds,
                    None,
                    Some(e.to_string()),
                ))
                .await;
            }
        }

        outcome
    }

    async fn run(
        &self,
        mut state: QueryState,
        max_rounds: usize,
        token: &CancellationToken,
    ) -> QueryResult {
        let definitions = self.executor.registry().list_definitions();
        let options = self.chat_options();

        loop {
            state.rounds += 1;
            let round = state.rounds;
            tracing::debug!("Query {} round {}/{}", state.id, round, max_rounds);

            let response = match self
                .call_model(&state, round, &definitions, &options, token)
                .await
            {
                Ok(response) => response,
                Err(kind) => return Err(state.fail(kind)),
            };
            if let Some(usage) = response.usage {
                state.usage += usage;
            }

            let (content, calls) = match response.reply {
                ModelReply::Text(text) => {
                    if let Err(e) = state.conversation.push_assistant(text.clone()) {
                        return Err(state.fail(OrchestrationErrorKind::Conversation(e)));
                    }
                    return Ok(state.finish(text, false));
                }
                ModelReply::ToolCalls { content, calls } => (content, calls),
            };

            tracing::debug!("Round {} requested {} tool call(s)", round, calls.len());
            for call in &calls {
                self.record(TrajectoryEntry::tool_call(&state.id, round, call))
                    .await;
            }
            if let Err(e) = state.conversation.push_tool_calls(content, calls.clone()) {
                return Err(state.fail(OrchestrationErrorKind::Conversation(e)));
            }

            let results = self.executor.execute_with_cancel(&calls, token).await;
            for result in results {
                if let Some(error) = result.error() {
                    tracing::warn!("Tool {} failed: {}", result.tool_name, error);
                }
                self.record(TrajectoryEntry::tool_result(&state.id, round, &result))
                    .await;
                if let Err(e) = state.conversation.push_tool_result(&result) {
                    return Err(state.fail(OrchestrationErrorKind::Conversation(e)));
                }
                state.tool_results.push(result);
            }

            if token.is_cancelled() {
                return Err(state.fail(OrchestrationErrorKind::Cancelled));
            }

            if round >= max_rounds {
                return match self.config.limit_policy {
                    LimitPolicy::Fail => {
                        tracing::warn!("Query {} hit the limit of {} rounds", state.id, max_rounds);
                        Err(state.fail(OrchestrationErrorKind::MaxRoundsExceeded { max_rounds }))
                    }
                    LimitPolicy::FinalAnswer => self.final_answer(state, &options, token).await,
                };
            }
        }
    }

    /// One extra model call without tools after the round limit was hit
    async fn final_answer(
        &self,
        mut state: QueryState,
        options: &ChatOptions,
        token: &CancellationToken,
    ) -> QueryResult {
        tracing::warn!(
            "Query {} reached max rounds, requesting a final answer without tools",
            state.id
        );
        state.rounds += 1;
        let round = state.rounds;

        let response = match self.call_model(&state, round, &[], options, token).await {
            Ok(response) => response,
            Err(kind) => return Err(state.fail(kind)),
        };
        if let Some(usage) = response.usage {
            state.usage += usage;
        }

        let text = match response.reply {
            ModelReply::Text(text) => text,
            ModelReply::ToolCalls { content, calls } => {
                tracing::warn!(
                    "Model requested {} tool call(s) after the round limit; ignoring them",
                    calls.len()
                );
                content
            }
        };
        if let Err(e) = state.conversation.push_assistant(text.clone()) {
            return Err(state.fail(OrchestrationErrorKind::Conversation(e)));
        }
        Ok(state.finish(text, true))
    }

    async fn call_model(
        &self,
        state: &QueryState,
        round: usize,
        definitions: &[ToolDefinition],
        options: &ChatOptions,
        token: &CancellationToken,
    ) -> std::result::Result<LlmResponse, OrchestrationErrorKind> {
        if token.is_cancelled() {
            return Err(OrchestrationErrorKind::Cancelled);
        }

        let messages = state.conversation.messages();
        self.record(TrajectoryEntry::llm_request(
            &state.id,
            round,
            messages.len(),
            definitions.iter().map(|d| d.name.clone()).collect(),
        ))
        .await;

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(OrchestrationErrorKind::Cancelled),
            response = self.client.chat_completion(messages, definitions, options) => response,
        };

        match response {
            Ok(response) => {
                self.record(TrajectoryEntry::llm_response(
                    &state.id,
                    round,
                    &response.reply,
                    response.usage,
                ))
                .await;
                Ok(response)
            }
            Err(e) => {
                tracing::error!("Model request failed in round {}: {}", round, e);
                Err(OrchestrationErrorKind::ModelClient(e))
            }
        }
    }

    fn chat_options(&self) -> ChatOptions {
        let mut options = self.config.chat_options.clone();
        if options.parallel_tool_calls.is_none() {
            options.parallel_tool_calls = Some(self.config.executor.parallel);
        }
        options
    }

    async fn record(&self, entry: TrajectoryEntry) {
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(entry).await {
                tracing::warn!("Failed to record trajectory entry: {}", e);
            }
        }
    }
}
