//! Port doubles and request helpers shared by the router tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use hookflow_api::http::router::build_router;
use hookflow_api::state::{AppState, EnginePort, Ports};
use hookflow_core::port::engine::WorkflowEngine;
use hookflow_core::port::invoker::{AsyncInvoker, Invocation};
use hookflow_core::port::secret::SecretProvider;
use hookflow_core::port::status::StatusSink;
use hookflow_core::port::task::{TaskRequest, TaskRun, TaskRunner};
use hookflow_infra::engine::LocalEngine;
use hookflow_types::config::BridgeConfig;
use hookflow_types::error::{DeliveryError, EngineError, InvokeError, SecretError};
use hookflow_types::event::Event;
use hookflow_types::execution::{ContinuationToken, ExecutionHandle, WorkerPayload};
use hookflow_types::secret::SecretReference;
use hookflow_types::status::StatusUpdate;
use hookflow_types::task::{ErrorKind, TaskError, TaskOutput};
use secrecy::SecretString;
use tokio::sync::Notify;
use tower::ServiceExt;

pub const NORMALIZED_EVENT: &str = r#"{
    "eventKind": "synchronize",
    "targetRevision": "abc123",
    "sourceLocation": "org/repo",
    "callbackSink": "org/repo/statuses/abc123"
}"#;

pub fn config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.engine.console_url_template =
        "http://console.test/executions/{execution_ref}".to_string();
    config.status.report_pending = false;
    config
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

pub struct StaticSecrets(HashMap<String, String>);

impl StaticSecrets {
    pub fn new() -> Self {
        Self(HashMap::from([(
            "env:GITHUB_TOKEN".to_string(),
            "ghp_test".to_string(),
        )]))
    }

    pub fn with(mut self, reference: &str, value: &str) -> Self {
        self.0.insert(reference.to_string(), value.to_string());
        self
    }
}

impl SecretProvider for StaticSecrets {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn resolve(
        &self,
        reference: &SecretReference,
    ) -> Result<Option<SecretString>, SecretError> {
        Ok(self
            .0
            .get(&reference.to_string())
            .map(|v| SecretString::from(v.clone())))
    }
}

// ---------------------------------------------------------------------------
// Status sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<(String, StatusUpdate)>>,
}

impl RecordingSink {
    /// Wait until at least `count` updates were published.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, StatusUpdate)> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let updates = self.updates.lock().unwrap();
                    if updates.len() >= count {
                        return updates.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("status was not published in time")
    }
}

impl StatusSink for RecordingSink {
    async fn set_status(
        &self,
        callback_sink: &str,
        update: &StatusUpdate,
        _credential: &SecretString,
    ) -> Result<(), DeliveryError> {
        self.updates
            .lock()
            .unwrap()
            .push((callback_sink.to_string(), update.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task runner
// ---------------------------------------------------------------------------

pub enum Outcome {
    /// Check out exactly the requested revision.
    CheckOut,
    Fail(ErrorKind, &'static str),
    /// Block until the gate is opened, then check out.
    Gated(Arc<Notify>),
}

pub struct ScriptedRunner {
    outcome: Outcome,
    pub requests: Mutex<Vec<TaskRequest>>,
}

impl ScriptedRunner {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(vec![]),
        }
    }
}

impl TaskRunner for ScriptedRunner {
    async fn run(
        &self,
        request: TaskRequest,
        _credential: SecretString,
    ) -> Result<TaskRun, TaskError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.outcome {
            Outcome::CheckOut => {}
            Outcome::Fail(kind, cause) => return Err(TaskError::new(*kind, *cause)),
            Outcome::Gated(gate) => gate.notified().await,
        }
        Ok(TaskRun {
            checked_out_revision: request.target_revision,
            changed_files: vec![],
            built: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine and invoker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingEngine {
    pub starts: Mutex<Vec<String>>,
    pub completions: Mutex<Vec<(String, TaskOutput)>>,
    pub failures: Mutex<Vec<(String, ErrorKind, String)>>,
}

impl RecordingEngine {
    pub async fn wait_for_presentation(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let presented = self.completions.lock().unwrap().len()
                    + self.failures.lock().unwrap().len();
                if presented > 0 {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("continuation was not presented in time")
    }
}

impl WorkflowEngine for RecordingEngine {
    async fn start_execution(
        &self,
        name: &str,
        _input: &Event,
    ) -> Result<ExecutionHandle, EngineError> {
        self.starts.lock().unwrap().push(name.to_string());
        Ok(ExecutionHandle {
            execution_id: name.to_string(),
            execution_ref: format!("recorded/{name}"),
        })
    }

    async fn complete_continuation(
        &self,
        token: ContinuationToken,
        output: &TaskOutput,
    ) -> Result<(), EngineError> {
        self.completions
            .lock()
            .unwrap()
            .push((token.into_inner(), output.clone()));
        Ok(())
    }

    async fn fail_continuation(
        &self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &str,
    ) -> Result<(), EngineError> {
        self.failures
            .lock()
            .unwrap()
            .push((token.into_inner(), error_kind, cause.to_string()));
        Ok(())
    }

    async fn stop_superseded(
        &self,
        _subject: &str,
        _keep: &str,
        _cause: &str,
    ) -> Result<usize, EngineError> {
        Ok(0)
    }
}

#[derive(Default)]
pub struct RecordingInvoker {
    pub payloads: Mutex<Vec<(String, Event)>>,
}

impl AsyncInvoker for RecordingInvoker {
    async fn invoke(&self, payload: WorkerPayload) -> Result<Invocation, InvokeError> {
        self.payloads
            .lock()
            .unwrap()
            .push((payload.continuation_token.into_inner(), payload.event));
        Ok(Invocation::Accepted)
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Doubles {
    pub engine: Arc<RecordingEngine>,
    pub invoker: Arc<RecordingInvoker>,
    pub runner: Arc<ScriptedRunner>,
    pub sink: Arc<RecordingSink>,
}

/// Router over recording doubles at every port.
pub async fn recorded(config: BridgeConfig, secrets: StaticSecrets, outcome: Outcome) -> (Router, Doubles) {
    let doubles = Doubles {
        engine: Arc::new(RecordingEngine::default()),
        invoker: Arc::new(RecordingInvoker::default()),
        runner: Arc::new(ScriptedRunner::new(outcome)),
        sink: Arc::new(RecordingSink::default()),
    };
    let state = AppState::with_ports(
        config,
        Ports {
            secrets: vec![Arc::new(secrets)],
            sink: doubles.sink.clone(),
            runner: doubles.runner.clone(),
            engine: EnginePort::Remote(doubles.engine.clone()),
            invoker: Some(doubles.invoker.clone()),
        },
    )
    .await
    .unwrap();
    (build_router(state), doubles)
}

/// Router over the in-process engine and worker, with a scripted task and a
/// recording sink.
pub async fn in_process(config: BridgeConfig, outcome: Outcome) -> (Router, Arc<ScriptedRunner>, Arc<RecordingSink>) {
    let runner = Arc::new(ScriptedRunner::new(outcome));
    let sink = Arc::new(RecordingSink::default());
    let (engine, driver) = LocalEngine::new(
        config.engine.state_machine.as_str(),
        config.engine.step_timeout(),
    );
    let state = AppState::with_ports(
        config,
        Ports {
            secrets: vec![Arc::new(StaticSecrets::new())],
            sink: sink.clone(),
            runner: runner.clone(),
            engine: EnginePort::Local(engine, driver),
            invoker: None,
        },
    )
    .await
    .unwrap();
    (build_router(state), runner, sink)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub fn post(uri: &str, headers: &[(&str, &str)], body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(body.into()).unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> (u16, serde_json::Value) {
    let response: Response<Body> = router.clone().oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
