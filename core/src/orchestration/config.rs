//! Orchestrator configuration structures

use crate::llm::{ChatOptions, LlmClient};
use crate::tools::{ExecutorConfig, ToolRegistry};
use crate::trajectory::TrajectoryRecorder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default number of model calls per query
pub const DEFAULT_MAX_ROUNDS: usize = 5;

/// What happens when the last allowed round still requests tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Fail with `MaxRoundsExceeded` and the partial trace
    #[default]
    Fail,
    /// Ask the model once more, without tools, for a final answer
    FinalAnswer,
}

/// Configuration for an orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum number of model calls per query
    pub max_rounds: usize,

    /// System prompt used when a query does not bring its own
    pub system_prompt: Option<String>,

    pub limit_policy: LimitPolicy,

    /// Sampling options sent with every model call
    pub chat_options: ChatOptions,

    pub executor: ExecutorConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            system_prompt: None,
            limit_policy: LimitPolicy::default(),
            chat_options: ChatOptions::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// Per-query overrides
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub system_prompt: Option<String>,
    pub max_rounds: Option<usize>,
    /// Overall time limit for the query
    pub deadline: Option<Duration>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// System prompt for this query only
    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Round limit for this query only
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    /// Cancel the query once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Builder for creating orchestrators
pub struct OrchestratorBuilder {
    client: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    config: OrchestratorConfig,
    recorder: Option<Arc<TrajectoryRecorder>>,
}

impl OrchestratorBuilder {
    /// Create a new builder around a model client, with no tools
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            registry: Arc::new(ToolRegistry::new()),
            config: OrchestratorConfig::default(),
            recorder: None,
        }
    }

    /// Use a registry owned by this orchestrator
    pub fn with_registry(self, registry: ToolRegistry) -> Self {
        self.with_shared_registry(Arc::new(registry))
    }

    /// Use a registry that is shared with other orchestrators
    pub fn with_shared_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Default round limit
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    /// Default system prompt
    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.config.system_prompt = Some(system_prompt.into());
        self
    }

    /// What happens when the round limit is hit
    pub fn with_limit_policy(mut self, limit_policy: LimitPolicy) -> Self {
        self.config.limit_policy = limit_policy;
        self
    }

    /// Sampling options sent with every model call
    pub fn with_chat_options(mut self, chat_options: ChatOptions) -> Self {
        self.config.chat_options = chat_options;
        self
    }

    /// Tool execution settings
    pub fn with_executor_config(mut self, executor: ExecutorConfig) -> Self {
        self.config.executor = executor;
        self
    }

    /// Set the per-invocation tool timeout; `None` disables it
    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.executor.tool_timeout = timeout;
        self
    }

    /// Run the tool calls of one round one after another
    pub fn sequential_tools(mut self) -> Self {
        self.config.executor.parallel = false;
        self
    }

    /// Record every query into the given trajectory recorder
    pub fn with_trajectory_recorder(mut self, recorder: Arc<TrajectoryRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> super::Orchestrator {
        super::Orchestrator::from_parts(self.client, self.registry, self.config, self.recorder)
    }
}
