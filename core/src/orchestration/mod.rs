//! Tool-calling orchestration engine

pub mod config;
pub mod engine;
pub mod result;

pub use config::{
    LimitPolicy, OrchestratorBuilder, OrchestratorConfig, QueryOptions, DEFAULT_MAX_ROUNDS,
};
pub use engine::Orchestrator;
pub use result::{OrchestrationResult, PartialTrace};
