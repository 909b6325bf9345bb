// Tool dispatch engine
//
// validate → fingerprint → cache lookup → (miss) build → run → wrap →
// cache store. Only successful runs are written back.

use anyhow::anyhow;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cache::{fingerprint_request, Fingerprint, ResultCache};
use crate::errors::{GatewayError, Result};
use crate::tools::registry::{ToolCommand, ToolRegistry};
use crate::tools::runner::ProcessRunner;
use crate::tools::types::{ToolKind, ToolRequest, ToolResponse};

/// Lifetime of a memoized success
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Orchestrates validation, caching and execution for every tool request
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    cache: Arc<dyn ResultCache>,
    runner: Arc<dyn ProcessRunner>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        cache: Arc<dyn ResultCache>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            registry,
            cache,
            runner,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn ResultCache> {
        &self.cache
    }

    /// Handle one tool request
    ///
    /// Returns `Err` only for validation failures and internal faults; a
    /// failed or timed-out tool run is an `Ok` failure envelope.
    pub async fn dispatch(&self, tool: ToolKind, body: &Map<String, Value>) -> Result<ToolResponse> {
        let command_builder = self
            .registry
            .get(tool)
            .ok_or_else(|| GatewayError::UnknownTool(tool.to_string()))?;

        let request = command_builder.validate(body)?;
        let key = fingerprint_request(&request);

        let span = info_span!(
            "dispatch",
            tool = %tool,
            request_id = %uuid::Uuid::new_v4(),
            fingerprint = %key
        );

        self.lookup_or_run(command_builder, &request, &key)
            .instrument(span)
            .await
    }

    async fn lookup_or_run(
        &self,
        command_builder: &dyn ToolCommand,
        request: &ToolRequest,
        key: &Fingerprint,
    ) -> Result<ToolResponse> {
        let tool = request.tool();

        if let Some(cached) = self.cache.get(key).await {
            info!("Returning cached result");
            return Ok(cached);
        }
        debug!(backend = self.cache.backend(), "Cache miss");

        let command = command_builder.build(request)?;
        let program = command.argv.first().cloned().unwrap_or_default();
        let started = Instant::now();

        // Own task per run so a slow tool never stalls the caller's executor slot.
        // Dropping the request (client went away) aborts the task, and the
        // child is killed with it.
        let runner = Arc::clone(&self.runner);
        let outcome = AbortOnDropHandle::new(tokio::spawn(async move { runner.run(&command).await }))
            .await
            .map_err(|e| {
                error!(error = %e, "Tool execution task failed");
                GatewayError::Internal(anyhow!("tool execution task failed: {}", e))
            })?;

        let response = match outcome.into_result(&program) {
            Ok(stdout) => ToolResponse::success(tool, stdout),
            Err(e) => {
                warn!(timeout = e.is_timeout(), error = %e, "Tool execution failed");
                ToolResponse::failure(tool, e.to_string())
            }
        };

        info!(
            success = response.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool run finished"
        );

        if response.success {
            self.cache.put(key, &response, CACHE_TTL).await;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoopCache};
    use crate::config::GatewayConfig;
    use crate::errors::ValidationError;
    use crate::tools::runner::{ExitState, ProcessOutcome};
    use crate::tools::types::CommandSpec;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Runner that records commands and replays a canned outcome
    struct ScriptedRunner {
        state: ExitState,
        stdout: String,
        stderr: String,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        fn new(state: ExitState, stdout: &str, stderr: &str) -> Arc<Self> {
            Arc::new(Self {
                state,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, command: &CommandSpec) -> ProcessOutcome {
            self.calls.lock().unwrap().push(command.clone());
            ProcessOutcome {
                stdout: self.stdout.clone(),
                stderr: self.stderr.clone(),
                state: self.state.clone(),
                elapsed: Duration::from_millis(1),
            }
        }
    }

    fn dispatcher(runner: Arc<ScriptedRunner>, cache: Arc<dyn ResultCache>) -> Dispatcher {
        let registry = Arc::new(ToolRegistry::from_config(&GatewayConfig::default()));
        Dispatcher::new(registry, cache, runner)
    }

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_theharvester_scenario() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "result-data", "");
        let dispatcher = dispatcher(runner.clone(), Arc::new(MemoryCache::new()));
        let request = body(json!({"domain": "example.com"}));

        let first = dispatcher.dispatch(ToolKind::TheHarvester, &request).await.unwrap();
        assert_eq!(
            first,
            ToolResponse::success(ToolKind::TheHarvester, "result-data".to_string())
        );

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].argv.windows(2).any(|w| w == ["-d", "example.com"]));

        let second = dispatcher.dispatch(ToolKind::TheHarvester, &request).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(runner.calls().len(), 1, "second request must be served from cache");
    }

    #[tokio::test]
    async fn test_explicit_defaults_share_cache_entry() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "hosts", "");
        let dispatcher = dispatcher(runner.clone(), Arc::new(MemoryCache::new()));

        dispatcher
            .dispatch(ToolKind::TheHarvester, &body(json!({"domain": "example.com"})))
            .await
            .unwrap();
        dispatcher
            .dispatch(
                ToolKind::TheHarvester,
                &body(json!({"limit": 500, "sources": ["google", "bing"], "domain": "example.com"})),
            )
            .await
            .unwrap();

        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_different_params_are_not_shared() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "hosts", "");
        let dispatcher = dispatcher(runner.clone(), Arc::new(MemoryCache::new()));

        for limit in [10, 20] {
            dispatcher
                .dispatch(
                    ToolKind::TheHarvester,
                    &body(json!({"domain": "example.com", "limit": limit})),
                )
                .await
                .unwrap();
        }

        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_never_cached() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(1)), "", "rate limited");
        let cache = Arc::new(MemoryCache::new());
        let dispatcher = dispatcher(runner.clone(), cache.clone());
        let request = body(json!({"imagePath": "/app/uploads/a.jpg"}));

        for _ in 0..3 {
            let response = dispatcher.dispatch(ToolKind::EagleEye, &request).await.unwrap();
            assert!(!response.success);
            assert_eq!(response.results, None);
            assert_eq!(response.error.as_deref(), Some("rate limited"));
        }

        assert_eq!(runner.calls().len(), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure_envelope() {
        let runner = ScriptedRunner::new(ExitState::TimedOut(Duration::from_secs(600)), "", "");
        let dispatcher = dispatcher(runner.clone(), Arc::new(MemoryCache::new()));

        let response = dispatcher
            .dispatch(ToolKind::SocialMapper, &body(json!({"imagePath": "/a.png"})))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("Command timed out after 600 seconds")
        );
        assert_eq!(runner.calls()[0].timeout, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_launch_failure_becomes_failure_envelope() {
        let runner = ScriptedRunner::new(
            ExitState::LaunchFailed("No such file or directory (os error 2)".to_string()),
            "",
            "",
        );
        let dispatcher = dispatcher(runner, Arc::new(NoopCache));

        let response = dispatcher
            .dispatch(ToolKind::TheHarvester, &body(json!({"domain": "example.com"})))
            .await
            .unwrap();

        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.contains("No such file or directory"));
        assert!(!error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_validation_short_circuits() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "unused", "");
        let cache = Arc::new(MemoryCache::new());
        let dispatcher = dispatcher(runner.clone(), cache.clone());

        let err = dispatcher
            .dispatch(ToolKind::TheHarvester, &body(json!({"sources": ["google"]})))
            .await
            .unwrap_err();

        match err {
            GatewayError::Validation(ValidationError::Missing { field }) => assert_eq!(field, "domain"),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(runner.calls().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_works_without_cache() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "ok", "");
        let dispatcher = dispatcher(runner.clone(), Arc::new(NoopCache));
        let request = body(json!({"domain": "example.com"}));

        for _ in 0..2 {
            let response = dispatcher.dispatch(ToolKind::TheHarvester, &request).await.unwrap();
            assert!(response.success);
        }
        assert_eq!(runner.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_unregistered_tool() {
        let runner = ScriptedRunner::new(ExitState::Exited(Some(0)), "", "");
        let dispatcher = Dispatcher::new(
            Arc::new(ToolRegistry::new()),
            Arc::new(NoopCache),
            runner,
        );

        let err = dispatcher
            .dispatch(ToolKind::EagleEye, &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTool(_)));
    }

    /// Runner that takes a fixed time per call and notices being dropped
    struct SlowRunner {
        delay: Duration,
        calls: AtomicUsize,
        dropped: Arc<AtomicBool>,
    }

    impl SlowRunner {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                calls: AtomicUsize::new(0),
                dropped: Arc::new(AtomicBool::new(false)),
            })
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ProcessRunner for SlowRunner {
        async fn run(&self, _command: &CommandSpec) -> ProcessOutcome {
            let guard = DropFlag(Arc::clone(&self.dropped));
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            std::mem::forget(guard);
            ProcessOutcome {
                stdout: "slow-result".to_string(),
                stderr: String::new(),
                state: ExitState::Exited(Some(0)),
                elapsed: self.delay,
            }
        }
    }

    #[tokio::test]
    async fn test_independent_requests_run_concurrently() {
        let delay = Duration::from_millis(300);
        let runner = SlowRunner::new(delay);
        let registry = Arc::new(ToolRegistry::from_config(&GatewayConfig::default()));
        let dispatcher = Dispatcher::new(registry, Arc::new(MemoryCache::new()), runner.clone());

        let first = body(json!({"domain": "example.com"}));
        let second = body(json!({"domain": "example.org"}));

        let start = Instant::now();
        let (a, b) = tokio::join!(
            dispatcher.dispatch(ToolKind::TheHarvester, &first),
            dispatcher.dispatch(ToolKind::TheHarvester, &second)
        );

        assert!(a.unwrap().success);
        assert!(b.unwrap().success);
        assert!(
            start.elapsed() < delay * 2 - Duration::from_millis(50),
            "runs were serialized: {:?}",
            start.elapsed()
        );
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_identical_concurrent_requests_both_succeed() {
        let runner = SlowRunner::new(Duration::from_millis(300));
        let cache = MemoryCache::new();
        let registry = Arc::new(ToolRegistry::from_config(&GatewayConfig::default()));
        let dispatcher = Dispatcher::new(registry, Arc::new(cache.clone()), runner.clone());
        let request = body(json!({"domain": "example.com"}));

        let (a, b) = tokio::join!(
            dispatcher.dispatch(ToolKind::TheHarvester, &request),
            dispatcher.dispatch(ToolKind::TheHarvester, &request)
        );

        let a = a.unwrap();
        let b = b.unwrap();
        assert!(a.success && b.success);
        assert_eq!(a, b);
        // Both missed the cache; no coalescing
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_request_aborts_run() {
        let runner = SlowRunner::new(Duration::from_secs(60));
        let cache = MemoryCache::new();
        let registry = Arc::new(ToolRegistry::from_config(&GatewayConfig::default()));
        let dispatcher = Dispatcher::new(registry, Arc::new(cache.clone()), runner.clone());
        let request = body(json!({"domain": "example.com"}));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            dispatcher.dispatch(ToolKind::TheHarvester, &request),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
        assert!(runner.dropped.load(Ordering::SeqCst), "run kept going after the caller left");
        assert!(cache.is_empty());
    }

    struct PanickingRunner;

    #[async_trait]
    impl ProcessRunner for PanickingRunner {
        async fn run(&self, _command: &CommandSpec) -> ProcessOutcome {
            panic!("runner bug");
        }
    }

    #[tokio::test]
    async fn test_runner_panic_is_internal_error() {
        let registry = Arc::new(ToolRegistry::from_config(&GatewayConfig::default()));
        let dispatcher = Dispatcher::new(registry, Arc::new(NoopCache), Arc::new(PanickingRunner));

        let err = dispatcher
            .dispatch(ToolKind::TheHarvester, &body(json!({"domain": "example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Internal(_)));
    }
}
