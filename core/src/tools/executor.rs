//! Concurrent tool execution
//!
//! Every invocation runs in its own tokio task, so a failing or panicking tool
//! cannot take the others down. Results are collected by the position of the
//! invocation, never by completion order.

use crate::error::ToolError;
use crate::tools::{ToolCall, ToolHandler, ToolRegistry, ToolResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default per-invocation time limit
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Execution settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Time limit for a single invocation; `None` waits indefinitely
    pub tool_timeout: Option<Duration>,

    /// Run the invocations of one round concurrently
    pub parallel: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tool_timeout: Some(DEFAULT_TOOL_TIMEOUT),
            parallel: true,
        }
    }
}

/// Tool executor that resolves invocations against a shared registry
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create a new tool executor with default settings
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_config(registry, ExecutorConfig::default())
    }

    /// Create a tool executor with explicit settings
    pub fn with_config(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Registry the invocations are resolved against
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Current execution settings
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a batch of tool calls.
    ///
    /// Returns exactly one result per call, in the order of `calls`.
    pub async fn execute(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        self.execute_with_cancel(calls, &CancellationToken::new())
            .await
    }

    /// Execute a batch of tool calls, aborting in-flight invocations when
    /// `cancel` fires. Aborted invocations yield [`ToolError::Cancelled`].
    pub async fn execute_with_cancel(
        &self,
        calls: &[ToolCall],
        cancel: &CancellationToken,
    ) -> Vec<ToolResult> {
        if calls.is_empty() {
            return Vec::new();
        }

        if self.config.parallel && calls.len() > 1 {
            debug!("Executing {} tool calls concurrently", calls.len());
            let handles: Vec<_> = calls
                .iter()
                .map(|call| tokio::spawn(self.invocation(call.clone(), cancel.clone())))
                .collect();
            let _guard = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

            futures::future::join_all(handles)
                .await
                .into_iter()
                .zip(calls)
                .map(|(joined, call)| joined.unwrap_or_else(|error| aborted(call, error)))
                .collect()
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                let handle = tokio::spawn(self.invocation(call.clone(), cancel.clone()));
                let _guard = AbortOnDrop(vec![handle.abort_handle()]);
                results.push(handle.await.unwrap_or_else(|error| aborted(call, error)));
            }
            results
        }
    }

    fn invocation(
        &self,
        call: ToolCall,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = ToolResult> + Send + 'static {
        let registry = Arc::clone(&self.registry);
        let timeout = self.config.tool_timeout;
        async move { run_invocation(&registry, call, timeout, &cancel).await }
    }
}

async fn run_invocation(
    registry: &ToolRegistry,
    call: ToolCall,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> ToolResult {
    let start = Instant::now();
    debug!("Executing tool call: {} (id: {})", call.name, call.id);

    let outcome = match prepare(registry, &call) {
        Ok((handler, arguments)) => {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ToolError::Cancelled { name: call.name.clone() }),
                result = call_with_timeout(handler.as_ref(), &call.name, arguments, timeout) => result,
            }
        }
        Err(error) => Err(error),
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let result = match outcome {
        Ok(value) => ToolResult::success(&call, value),
        Err(error) => {
            warn!("Tool call {} (id: {}) failed: {}", call.name, call.id, error);
            ToolResult::failure(&call, error)
        }
    };
    result.with_duration(duration_ms)
}

/// Resolve the handler and check the arguments before anything runs
fn prepare(
    registry: &ToolRegistry,
    call: &ToolCall,
) -> Result<(Arc<dyn ToolHandler>, Value), ToolError> {
    let tool = registry.lookup(&call.name)?;
    let arguments = normalize_arguments(&call.name, &call.arguments)?;

    tool.definition
        .parameters
        .validate(&arguments)
        .map_err(|violation| ToolError::invalid_arguments(&call.name, violation.to_string()))?;

    Ok((Arc::clone(&tool.handler), arguments))
}

/// Arguments may arrive as a JSON string when the provider could not parse them
fn normalize_arguments(name: &str, arguments: &Value) -> Result<Value, ToolError> {
    match arguments {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(raw) => serde_json::from_str(raw).map_err(|error| {
            ToolError::invalid_arguments(name, format!("arguments are not valid JSON: {}", error))
        }),
        other => Ok(other.clone()),
    }
}

async fn call_with_timeout(
    handler: &dyn ToolHandler,
    name: &str,
    arguments: Value,
    timeout: Option<Duration>,
) -> Result<Value, ToolError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, handler.call(arguments))
            .await
            .unwrap_or_else(|_| {
                Err(ToolError::Timeout {
                    name: name.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }),
        None => handler.call(arguments).await,
    }
}

/// Aborts still-running tool tasks when the awaiting future is dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn aborted(call: &ToolCall, error: JoinError) -> ToolResult {
    let message = if error.is_panic() {
        "tool panicked during execution".to_string()
    } else {
        format!("tool task aborted: {}", error)
    };
    warn!("Tool call {} (id: {}) {}", call.name, call.id, message);
    ToolResult::failure(call, ToolError::execution_failed(&call.name, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ObjectSchema, Schema};
    use crate::tools::{handler_fn, ToolDefinition, ToolOutcome};
    use serde_json::json;
    use tokio::sync::Barrier;

    fn city_schema() -> Schema {
        ObjectSchema::new()
            .required("city", Schema::string())
            .into()
    }

    fn registry_with(tools: Vec<(&'static str, Arc<dyn ToolHandler>)>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for (name, handler) in tools {
            registry
                .register_shared(ToolDefinition::new(name, name, city_schema()), handler)
                .unwrap();
        }
        Arc::new(registry)
    }

    fn delayed_echo(name: &'static str, delay_ms: u64) -> Arc<dyn ToolHandler> {
        Arc::new(handler_fn(name, move |args: Value| async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok::<Value, anyhow::Error>(json!({"tool": name, "city": args["city"]}))
        }))
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::with_id(id, name, json!({"city": "London"}))
    }

    #[tokio::test]
    async fn test_results_follow_call_order_not_completion_order() {
        let registry = registry_with(vec![
            ("slow", delayed_echo("slow", 120)),
            ("medium", delayed_echo("medium", 60)),
            ("fast", delayed_echo("fast", 1)),
        ]);
        let executor = ToolExecutor::new(registry);
        let calls = vec![call("1", "slow"), call("2", "medium"), call("3", "fast")];

        let results = executor.execute(&calls).await;

        assert_eq!(results.len(), 3);
        let ids: Vec<&str> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(results.iter().all(|r| r.is_success()));
        assert_eq!(
            results[0].outcome,
            ToolOutcome::Success(json!({"tool": "slow", "city": "London"}))
        );
    }

    #[tokio::test]
    async fn test_invocations_run_concurrently() {
        // Both handlers must be inside the barrier at the same time to pass it
        let barrier = Arc::new(Barrier::new(2));
        let make = |name: &'static str| -> Arc<dyn ToolHandler> {
            let barrier = Arc::clone(&barrier);
            Arc::new(handler_fn(name, move |_args: Value| {
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    Ok::<Value, anyhow::Error>(json!("passed"))
                }
            }))
        };
        let registry = registry_with(vec![("weather", make("weather")), ("calendar", make("calendar"))]);
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                tool_timeout: Some(Duration::from_secs(5)),
                parallel: true,
            },
        );

        let results = executor
            .execute(&[call("a", "weather"), call("b", "calendar")])
            .await;
        assert!(results.iter().all(|r| r.is_success()), "{:?}", results);
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_result_not_fault() {
        let registry = registry_with(vec![("known", delayed_echo("known", 1))]);
        let executor = ToolExecutor::new(registry);

        let results = executor
            .execute(&[call("1", "missing"), call("2", "known")])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].error(),
            Some(&ToolError::UnknownTool {
                name: "missing".into()
            })
        );
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected_before_call() {
        let invoked = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&invoked);
        let handler: Arc<dyn ToolHandler> = Arc::new(handler_fn("strict", move |_args: Value| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            async { Ok::<Value, anyhow::Error>(json!(null)) }
        }));
        let executor = ToolExecutor::new(registry_with(vec![("strict", handler)]));

        let results = executor
            .execute(&[ToolCall::with_id("1", "strict", json!({"city": 7}))])
            .await;

        assert_eq!(results[0].error().map(|e| e.kind()), Some("invalid_arguments"));
        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_string_arguments_are_parsed() {
        let executor = ToolExecutor::new(registry_with(vec![("echo", delayed_echo("echo", 0))]));

        let ok = executor
            .execute(&[ToolCall::with_id("1", "echo", json!(r#"{"city":"Paris"}"#))])
            .await;
        assert!(ok[0].is_success());

        let broken = executor
            .execute(&[ToolCall::with_id("2", "echo", json!("{city: Paris"))])
            .await;
        assert_eq!(broken[0].error().map(|e| e.kind()), Some("invalid_arguments"));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_affect_others() {
        let failing: Arc<dyn ToolHandler> = Arc::new(handler_fn("failing", |_args: Value| async {
            Err::<Value, _>(anyhow::anyhow!("service unavailable"))
        }));
        let registry = registry_with(vec![
            ("failing", failing),
            ("ok", delayed_echo("ok", 20)),
        ]);
        let executor = ToolExecutor::new(registry);

        let results = executor
            .execute(&[call("1", "ok"), call("2", "failing"), call("3", "ok")])
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert_eq!(
            results[1].error(),
            Some(&ToolError::execution_failed("failing", "service unavailable"))
        );
        assert!(results[2].is_success());
    }

    #[tokio::test]
    async fn test_panicking_tool_is_contained() {
        let panicking: Arc<dyn ToolHandler> = Arc::new(handler_fn("panicky", |_args: Value| async {
            if true {
                panic!("tool bug");
            }
            Ok::<Value, anyhow::Error>(json!(null))
        }));
        let registry = registry_with(vec![("panicky", panicking), ("ok", delayed_echo("ok", 1))]);
        let executor = ToolExecutor::new(registry);

        let results = executor.execute(&[call("1", "panicky"), call("2", "ok")]).await;

        assert_eq!(results[0].error().map(|e| e.kind()), Some("execution_failed"));
        assert!(results[1].is_success());
    }

    #[tokio::test]
    async fn test_timeout() {
        let registry = registry_with(vec![("sleepy", delayed_echo("sleepy", 10_000))]);
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                tool_timeout: Some(Duration::from_millis(50)),
                parallel: true,
            },
        );

        let results = executor.execute(&[call("1", "sleepy")]).await;
        assert_eq!(
            results[0].error(),
            Some(&ToolError::Timeout {
                name: "sleepy".into(),
                timeout_ms: 50
            })
        );
    }

    #[tokio::test]
    async fn test_cancellation_reaches_in_flight_tools() {
        let registry = registry_with(vec![("sleepy", delayed_echo("sleepy", 10_000))]);
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                tool_timeout: None,
                parallel: true,
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });

        let results = executor
            .execute_with_cancel(&[call("1", "sleepy"), call("2", "sleepy")], &cancel)
            .await;

        assert_eq!(results.len(), 2);
        for result in &results {
            assert_eq!(result.error().map(|e| e.kind()), Some("cancelled"));
        }
    }

    #[tokio::test]
    async fn test_sequential_mode_preserves_order() {
        let registry = registry_with(vec![
            ("slow", delayed_echo("slow", 30)),
            ("fast", delayed_echo("fast", 1)),
        ]);
        let executor = ToolExecutor::with_config(
            registry,
            ExecutorConfig {
                tool_timeout: None,
                parallel: false,
            },
        );

        let results = executor.execute(&[call("1", "slow"), call("2", "fast")]).await;
        let ids: Vec<&str> = results.iter().map(|r| r.tool_call_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_dropping_the_batch_aborts_running_tools() {
        let finished = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let handler: Arc<dyn ToolHandler> = Arc::new(handler_fn("slow", move |_args: Value| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok::<Value, anyhow::Error>(json!("done"))
            }
        }));
        let registry = registry_with(vec![("slow", handler)]);

        for parallel in [true, false] {
            let executor = ToolExecutor::with_config(
                Arc::clone(&registry),
                ExecutorConfig {
                    tool_timeout: None,
                    parallel,
                },
            );
            let calls = [call("1", "slow"), call("2", "slow")];
            let outcome =
                tokio::time::timeout(Duration::from_millis(30), executor.execute(&calls)).await;
            assert!(outcome.is_err());
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let executor = ToolExecutor::new(Arc::new(ToolRegistry::new()));
        assert!(executor.execute(&[]).await.is_empty());
    }
}
