//! In-process workflow engine.
//!
//! Runs the three-state workflow (dispatch, wait for the continuation,
//! report) inside the bridge process. Executions live in memory only; a
//! restart forgets them.
//!
//! [`LocalEngine`] is the [`WorkflowEngine`] handed to intake and worker.
//! [`LocalEngineDriver`] owns the receiving side and must be run once the
//! dispatcher and reporter exist. When enabled, the driver publishes the
//! `pending` status before dispatching, so it always precedes the terminal
//! status of the same execution.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use hookflow_core::port::engine::WorkflowEngine;
use hookflow_core::service::dispatcher::DispatcherService;
use hookflow_core::service::reporter::ReporterService;
use hookflow_types::error::EngineError;
use hookflow_types::event::Event;
use hookflow_types::execution::{
    ContinuationToken, DispatchRequest, ExecutionHandle, TerminalNotification,
};
use hookflow_types::task::{EngineFailure, ErrorKind, TaskOutput, TaskResult, TerminalResult};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

struct EngineState {
    state_machine: String,
    step_timeout: Duration,
    /// Running executions by name.
    running: DashMap<String, RunningExecution>,
    /// Outstanding continuation tokens.
    waiting: DashMap<String, oneshot::Sender<TaskResult>>,
}

struct RunningExecution {
    handle: ExecutionHandle,
    /// Change request the execution belongs to, if any.
    subject: Option<String>,
    /// Taken by the first stop request.
    stop: Option<oneshot::Sender<String>>,
}

struct StartedExecution {
    handle: ExecutionHandle,
    event: Event,
    stop: oneshot::Receiver<String>,
}

#[derive(Clone)]
pub struct LocalEngine {
    state: Arc<EngineState>,
    starts: mpsc::UnboundedSender<StartedExecution>,
}

pub struct LocalEngineDriver {
    state: Arc<EngineState>,
    starts: mpsc::UnboundedReceiver<StartedExecution>,
    report_pending: bool,
}

impl LocalEngine {
    pub fn new(state_machine: impl Into<String>, step_timeout: Duration) -> (Self, LocalEngineDriver) {
        let state = Arc::new(EngineState {
            state_machine: state_machine.into(),
            step_timeout,
            running: DashMap::new(),
            waiting: DashMap::new(),
        });
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                state: Arc::clone(&state),
                starts: tx,
            },
            LocalEngineDriver {
                state,
                starts: rx,
                report_pending: false,
            },
        )
    }

    /// Number of executions that have started and not yet reported.
    pub fn running_count(&self) -> usize {
        self.state.running.len()
    }

    fn resume(&self, token: ContinuationToken, result: TaskResult) -> Result<(), EngineError> {
        let Some((_, waiter)) = self.state.waiting.remove(token.expose()) else {
            return Err(EngineError::TokenConsumed);
        };
        // The receiver is gone once the step timed out.
        waiter.send(result).map_err(|_| EngineError::TokenConsumed)
    }
}

impl WorkflowEngine for LocalEngine {
    async fn start_execution(
        &self,
        name: &str,
        input: &Event,
    ) -> Result<ExecutionHandle, EngineError> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = match self.state.running.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                tracing::info!(execution_id = %name, "execution already running, reusing");
                return Ok(existing.get().handle.clone());
            }
            Entry::Vacant(slot) => {
                let handle = ExecutionHandle {
                    execution_id: name.to_string(),
                    execution_ref: format!("{}/{name}", self.state.state_machine),
                };
                slot.insert(RunningExecution {
                    handle: handle.clone(),
                    subject: input.change_subject(),
                    stop: Some(stop_tx),
                });
                handle
            }
        };

        let started = StartedExecution {
            handle: handle.clone(),
            event: input.clone(),
            stop: stop_rx,
        };
        if self.starts.send(started).is_err() {
            self.state.running.remove(name);
            return Err(EngineError::Unavailable(
                "local engine driver is not running".to_string(),
            ));
        }

        Ok(handle)
    }

    async fn complete_continuation(
        &self,
        token: ContinuationToken,
        output: &TaskOutput,
    ) -> Result<(), EngineError> {
        self.resume(
            token,
            TaskResult::Success {
                output: output.clone(),
            },
        )
    }

    async fn fail_continuation(
        &self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &str,
    ) -> Result<(), EngineError> {
        self.resume(
            token,
            TaskResult::Failure {
                error_kind,
                cause: cause.to_string(),
            },
        )
    }

    async fn stop_superseded(
        &self,
        subject: &str,
        keep: &str,
        cause: &str,
    ) -> Result<usize, EngineError> {
        let mut stopped = 0;
        for mut running in self.state.running.iter_mut() {
            if running.key() == keep || running.subject.as_deref() != Some(subject) {
                continue;
            }
            let Some(stop) = running.stop.take() else {
                continue;
            };
            if stop.send(cause.to_string()).is_ok() {
                tracing::info!(execution_id = %running.key(), %cause, "stopping superseded execution");
                stopped += 1;
            }
        }
        Ok(stopped)
    }
}

impl LocalEngineDriver {
    /// Publish a `pending` status ahead of each dispatch.
    pub fn with_pending_status(mut self, enabled: bool) -> Self {
        self.report_pending = enabled;
        self
    }

    /// Drive executions until every [`LocalEngine`] clone is dropped.
    pub async fn run(mut self, dispatcher: Arc<DispatcherService>, reporter: Arc<ReporterService>) {
        tracing::info!(state_machine = %self.state.state_machine, "local engine started");
        while let Some(started) = self.starts.recv().await {
            let state = Arc::clone(&self.state);
            let dispatcher = Arc::clone(&dispatcher);
            let reporter = Arc::clone(&reporter);
            let report_pending = self.report_pending;
            tokio::spawn(async move {
                execute(state, &dispatcher, &reporter, report_pending, started).await;
            });
        }
        tracing::info!("local engine stopped");
    }
}

async fn execute(
    state: Arc<EngineState>,
    dispatcher: &DispatcherService,
    reporter: &ReporterService,
    report_pending: bool,
    started: StartedExecution,
) {
    let StartedExecution {
        handle,
        event,
        mut stop,
    } = started;
    if report_pending {
        if let Err(e) = reporter.report_pending(&event, &handle).await {
            tracing::warn!(execution_id = %handle.execution_id, error = %e, "pending status not published");
        }
    }
    let result = run_task_step(&state, dispatcher, &handle, &event, &mut stop).await;
    state.running.remove(&handle.execution_id);

    let notification = TerminalNotification {
        event,
        execution: Some(handle.clone()),
        result,
    };
    if let Err(e) = reporter.report(notification).await {
        tracing::warn!(execution_id = %handle.execution_id, error = %e, "terminal report failed");
    }
}

/// Dispatch with a fresh token and wait, bounded, for it to come back or
/// for a stop request.
async fn run_task_step(
    state: &EngineState,
    dispatcher: &DispatcherService,
    handle: &ExecutionHandle,
    event: &Event,
    stop: &mut oneshot::Receiver<String>,
) -> TerminalResult {
    if let Ok(cause) = stop.try_recv() {
        return superseded(handle, cause);
    }

    let token = Uuid::new_v4().to_string();
    let (tx, rx) = oneshot::channel();
    state.waiting.insert(token.clone(), tx);

    let request = DispatchRequest {
        continuation_token: Some(ContinuationToken::new(token.clone())),
        event: event.clone(),
    };
    if let Err(e) = dispatcher.dispatch(request).await {
        state.waiting.remove(&token);
        tracing::error!(execution_id = %handle.execution_id, error = %e, "dispatch step failed");
        return TerminalResult::Engine(EngineFailure::new(EngineFailure::TASK_FAILED, e.to_string()));
    }

    let outcome = tokio::select! {
        outcome = tokio::time::timeout(state.step_timeout, rx) => outcome,
        Ok(cause) = &mut *stop => {
            state.waiting.remove(&token);
            return superseded(handle, cause);
        }
    };

    match outcome {
        Ok(Ok(result)) => TerminalResult::Task(result),
        Ok(Err(_)) => TerminalResult::Engine(EngineFailure::new(
            EngineFailure::TASK_FAILED,
            "continuation was dropped",
        )),
        Err(_) => {
            state.waiting.remove(&token);
            tracing::warn!(
                execution_id = %handle.execution_id,
                timeout_secs = state.step_timeout.as_secs_f64(),
                "task step timed out"
            );
            TerminalResult::Engine(EngineFailure::new(
                EngineFailure::TIMEOUT,
                format!(
                    "no continuation within {}s",
                    state.step_timeout.as_secs_f64()
                ),
            ))
        }
    }
}

fn superseded(handle: &ExecutionHandle, cause: String) -> TerminalResult {
    tracing::info!(execution_id = %handle.execution_id, %cause, "execution superseded");
    TerminalResult::Engine(EngineFailure::new(EngineFailure::SUPERSEDED, cause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_core::port::engine::WorkflowEngineDyn;
    use hookflow_core::port::invoker::{AsyncInvoker, Invocation};
    use hookflow_core::port::secret::SecretProvider;
    use hookflow_core::port::status::StatusSink;
    use hookflow_core::service::reporter::ReporterSettings;
    use hookflow_core::service::secret::SecretStore;
    use hookflow_types::error::{DeliveryError, InvokeError, SecretError};
    use hookflow_types::execution::WorkerPayload;
    use hookflow_types::secret::SecretReference;
    use hookflow_types::status::{StatusState, StatusUpdate};
    use secrecy::SecretString;
    use serde_json::json;
    use std::sync::Mutex;

    fn event() -> Event {
        serde_json::from_value(json!({
            "eventKind": "synchronize",
            "targetRevision": "abc123",
            "sourceLocation": "org/repo",
            "callbackSink": "org/repo/statuses/abc123"
        }))
        .unwrap()
    }

    fn change_request(revision: &str, number: u64) -> Event {
        serde_json::from_value(json!({
            "eventKind": "synchronize",
            "targetRevision": revision,
            "sourceLocation": "org/repo",
            "callbackSink": format!("org/repo/statuses/{revision}"),
            "changeNumber": number
        }))
        .unwrap()
    }

    struct Token;

    impl SecretProvider for Token {
        fn name(&self) -> &'static str {
            "static"
        }

        async fn resolve(
            &self,
            _reference: &SecretReference,
        ) -> Result<Option<SecretString>, SecretError> {
            Ok(Some(SecretString::from("ghp_test".to_string())))
        }
    }

    struct Sink {
        updates: Mutex<Vec<StatusUpdate>>,
        notify: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl StatusSink for Sink {
        async fn set_status(
            &self,
            _callback_sink: &str,
            update: &StatusUpdate,
            _credential: &SecretString,
        ) -> Result<(), DeliveryError> {
            self.updates.lock().unwrap().push(update.clone());
            if update.state() == StatusState::Pending {
                return Ok(());
            }
            if let Some(tx) = self.notify.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Ok(())
        }
    }

    /// Hands every token to a channel instead of a worker.
    struct Capture(mpsc::UnboundedSender<String>);

    impl AsyncInvoker for Capture {
        async fn invoke(&self, payload: WorkerPayload) -> Result<Invocation, InvokeError> {
            let _ = self.0.send(payload.continuation_token.into_inner());
            Ok(Invocation::Accepted)
        }
    }

    struct Harness {
        engine: LocalEngine,
        sink: Arc<Sink>,
        tokens: mpsc::UnboundedReceiver<String>,
        reported: oneshot::Receiver<()>,
    }

    fn harness(step_timeout: Duration) -> Harness {
        harness_with(step_timeout, false)
    }

    fn harness_with(step_timeout: Duration, report_pending: bool) -> Harness {
        let (engine, driver) = LocalEngine::new("hookflow", step_timeout);
        let driver = driver.with_pending_status(report_pending);
        let (tx, tokens) = mpsc::unbounded_channel();
        let (notify, reported) = oneshot::channel();
        let sink = Arc::new(Sink {
            updates: Mutex::new(vec![]),
            notify: Mutex::new(Some(notify)),
        });

        let dispatcher = Arc::new(DispatcherService::new(Arc::new(Capture(tx))));
        let reporter = Arc::new(ReporterService::new(
            Arc::new(SecretStore::new(vec![Arc::new(Token)])),
            sink.clone(),
            ReporterSettings {
                credential: SecretReference::Env("GITHUB_TOKEN".to_string()),
                context: "hookflow".to_string(),
                target_url_template: "http://console/{execution_ref}".to_string(),
            },
        ));
        tokio::spawn(driver.run(dispatcher, reporter));

        Harness {
            engine,
            sink,
            tokens,
            reported,
        }
    }

    // ---------------------------------------------------------------------------
    // Starts
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_is_idempotent_by_name() {
        let h = harness(Duration::from_secs(5));

        let first = h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();
        let second = h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.execution_ref, "hookflow/repo-abc123-r1");
        assert_eq!(h.engine.running_count(), 1);
    }

    #[tokio::test]
    async fn test_start_without_driver_is_unavailable() {
        let (engine, driver) = LocalEngine::new("hookflow", Duration::from_secs(5));
        drop(driver);

        let err = engine.start_execution("repo-abc123-r1", &event()).await.unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
        assert_eq!(engine.running_count(), 0);
    }

    // ---------------------------------------------------------------------------
    // Continuations
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_success_continuation_reports_success() {
        let mut h = harness(Duration::from_secs(5));
        h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();

        let token = h.tokens.recv().await.unwrap();
        let output = TaskOutput {
            revision: "abc123".to_string(),
            changed_files: vec![],
            built: false,
        };
        h.engine
            .complete_continuation_boxed(ContinuationToken::new(token.clone()), &output)
            .await
            .unwrap();

        h.reported.await.unwrap();
        let updates = h.sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state(), StatusState::Success);
        assert_eq!(updates[0].target_url(), "http://console/hookflow/repo-abc123-r1");
        drop(updates);

        // Single use.
        let err = h
            .engine
            .complete_continuation(ContinuationToken::new(token), &output)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TokenConsumed));
    }

    #[tokio::test]
    async fn test_failure_continuation_reports_failure() {
        let mut h = harness(Duration::from_secs(5));
        h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();

        let token = h.tokens.recv().await.unwrap();
        h.engine
            .fail_continuation(
                ContinuationToken::new(token),
                ErrorKind::TaskExecutionFailed,
                "clone timeout",
            )
            .await
            .unwrap();

        h.reported.await.unwrap();
        let updates = h.sink.updates.lock().unwrap();
        assert_eq!(updates[0].state(), StatusState::Failure);
        assert!(updates[0].description().contains("clone timeout"));
    }

    #[tokio::test]
    async fn test_step_timeout_reports_engine_error() {
        let mut h = harness(Duration::from_millis(50));
        h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();
        let token = h.tokens.recv().await.unwrap();

        h.reported.await.unwrap();
        {
            let updates = h.sink.updates.lock().unwrap();
            assert_eq!(updates[0].state(), StatusState::Error);
            assert!(updates[0].description().contains(EngineFailure::TIMEOUT));
        }
        assert_eq!(h.engine.running_count(), 0);

        let err = h
            .engine
            .fail_continuation(ContinuationToken::new(token), ErrorKind::Timeout, "late")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TokenConsumed));
    }

    #[tokio::test]
    async fn test_unknown_token_is_consumed() {
        let h = harness(Duration::from_secs(5));
        let err = h
            .engine
            .fail_continuation(ContinuationToken::new("nope"), ErrorKind::Timeout, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TokenConsumed));
    }

    // ---------------------------------------------------------------------------
    // Pending status
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pending_is_published_before_dispatch() {
        let mut h = harness_with(Duration::from_secs(5), true);
        h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();

        let token = h.tokens.recv().await.unwrap();
        {
            let updates = h.sink.updates.lock().unwrap();
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].state(), StatusState::Pending);
        }

        h.engine
            .fail_continuation(ContinuationToken::new(token), ErrorKind::TaskExecutionFailed, "boom")
            .await
            .unwrap();
        h.reported.await.unwrap();

        let states: Vec<_> = h.sink.updates.lock().unwrap().iter().map(|u| u.state()).collect();
        assert_eq!(states, vec![StatusState::Pending, StatusState::Failure]);
    }

    // ---------------------------------------------------------------------------
    // Supersede
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_newer_revision_stops_running_execution() {
        let mut h = harness(Duration::from_secs(5));
        h.engine
            .start_execution("repo-abc123-d1", &change_request("abc123", 7))
            .await
            .unwrap();
        let token = h.tokens.recv().await.unwrap();

        let stopped = h
            .engine
            .stop_superseded_boxed("org/repo#7", "repo-def456-d2", "New commit pushed to PR #7")
            .await
            .unwrap();
        assert_eq!(stopped, 1);

        h.reported.await.unwrap();
        {
            let updates = h.sink.updates.lock().unwrap();
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].state(), StatusState::Error);
            assert!(updates[0].description().contains(EngineFailure::SUPERSEDED));
            assert!(updates[0].description().contains("New commit pushed to PR #7"));
        }
        assert_eq!(h.engine.running_count(), 0);

        let output = TaskOutput {
            revision: "abc123".to_string(),
            changed_files: vec![],
            built: false,
        };
        let err = h
            .engine
            .complete_continuation(ContinuationToken::new(token), &output)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TokenConsumed));
    }

    #[tokio::test]
    async fn test_stop_spares_kept_and_unrelated_executions() {
        let mut h = harness(Duration::from_secs(5));
        h.engine
            .start_execution("repo-abc123-d1", &change_request("abc123", 7))
            .await
            .unwrap();
        h.engine
            .start_execution("repo-fed999-d3", &change_request("fed999", 8))
            .await
            .unwrap();
        h.engine.start_execution("repo-abc123-r1", &event()).await.unwrap();
        for _ in 0..3 {
            h.tokens.recv().await.unwrap();
        }

        let stopped = h
            .engine
            .stop_superseded("org/repo#7", "repo-abc123-d1", "New commit pushed to PR #7")
            .await
            .unwrap();

        assert_eq!(stopped, 0);
        assert_eq!(h.engine.running_count(), 3);
    }
}
