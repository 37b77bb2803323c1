//! Recording test doubles for every port.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use hookflow_types::error::{DeliveryError, EngineError, InvokeError, SecretError};
use hookflow_types::event::Event;
use hookflow_types::execution::{ContinuationToken, ExecutionHandle, WorkerPayload};
use hookflow_types::secret::SecretReference;
use hookflow_types::status::StatusUpdate;
use hookflow_types::task::{ErrorKind, TaskError, TaskOutput};
use secrecy::{ExposeSecret, SecretString};

use crate::port::engine::WorkflowEngine;
use crate::port::invoker::{AsyncInvoker, Invocation};
use crate::port::secret::SecretProvider;
use crate::port::status::StatusSink;
use crate::port::task::{TaskRequest, TaskRun, TaskRunner};

pub fn event(json: serde_json::Value) -> Event {
    serde_json::from_value(json).unwrap()
}

pub fn sample_event() -> Event {
    event(serde_json::json!({
        "eventKind": "synchronize",
        "targetRevision": "abc123",
        "sourceLocation": "org/repo",
        "callbackSink": "org/repo/statuses/abc123"
    }))
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reference: &str, value: &str) -> Self {
        self.values.insert(reference.to_string(), value.to_string());
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
            .values
            .get(&reference.to_string())
            .map(|v| SecretString::from(v.clone())))
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingEngine {
    pub starts: Mutex<Vec<(String, Event)>>,
    pub completions: Mutex<Vec<(String, TaskOutput)>>,
    pub failures: Mutex<Vec<(String, ErrorKind, String)>>,
    /// `(subject, keep, cause)` per stop request.
    pub stops: Mutex<Vec<(String, String, String)>>,
    pub reject_starts: bool,
    pub reject_presentations: bool,
    pub reject_stops: bool,
}

impl RecordingEngine {
    pub fn presentations(&self) -> usize {
        self.completions.lock().unwrap().len() + self.failures.lock().unwrap().len()
    }
}

impl WorkflowEngine for RecordingEngine {
    async fn start_execution(
        &self,
        name: &str,
        input: &Event,
    ) -> Result<ExecutionHandle, EngineError> {
        if self.reject_starts {
            return Err(EngineError::Unavailable("connection refused".to_string()));
        }
        self.starts
            .lock()
            .unwrap()
            .push((name.to_string(), input.clone()));
        Ok(ExecutionHandle {
            execution_id: name.to_string(),
            execution_ref: format!("hookflow/{name}"),
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
        if self.reject_presentations {
            return Err(EngineError::TokenConsumed);
        }
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
        if self.reject_presentations {
            return Err(EngineError::TokenConsumed);
        }
        Ok(())
    }

    async fn stop_superseded(
        &self,
        subject: &str,
        keep: &str,
        cause: &str,
    ) -> Result<usize, EngineError> {
        if self.reject_stops {
            return Err(EngineError::Unavailable("connection refused".to_string()));
        }
        self.stops
            .lock()
            .unwrap()
            .push((subject.to_string(), keep.to_string(), cause.to_string()));
        Ok(1)
    }
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

pub struct RecordingInvoker {
    pub payloads: Mutex<Vec<(String, Event)>>,
    outcome: Result<Invocation, String>,
}

impl RecordingInvoker {
    pub fn accepting() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            outcome: Ok(Invocation::Accepted),
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            outcome: Ok(Invocation::Rejected {
                status,
                reason: "throttled".to_string(),
            }),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            payloads: Mutex::new(Vec::new()),
            outcome: Err("connection refused".to_string()),
        }
    }
}

impl AsyncInvoker for RecordingInvoker {
    async fn invoke(&self, payload: WorkerPayload) -> Result<Invocation, InvokeError> {
        self.payloads
            .lock()
            .unwrap()
            .push((payload.continuation_token.into_inner(), payload.event));
        self.outcome.clone().map_err(InvokeError::Transport)
    }
}

// ---------------------------------------------------------------------------
// Status sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    pub updates: Mutex<Vec<(String, StatusUpdate, String)>>,
    pub reject: bool,
}

impl StatusSink for RecordingSink {
    async fn set_status(
        &self,
        callback_sink: &str,
        update: &StatusUpdate,
        credential: &SecretString,
    ) -> Result<(), DeliveryError> {
        self.updates.lock().unwrap().push((
            callback_sink.to_string(),
            update.clone(),
            credential.expose_secret().to_string(),
        ));
        if self.reject {
            return Err(DeliveryError::Rejected {
                status: 422,
                body: "Validation Failed".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task runner
// ---------------------------------------------------------------------------

pub enum Script {
    Succeed(TaskRun),
    Fail(TaskError),
    Hang,
    Panic,
}

pub struct ScriptedRunner {
    script: Script,
    pub requests: Mutex<Vec<(TaskRequest, String)>>,
}

impl ScriptedRunner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn checks_out(revision: &str) -> Self {
        Self::new(Script::Succeed(TaskRun {
            checked_out_revision: revision.to_string(),
            changed_files: vec!["config-eu.yaml".to_string()],
            built: true,
        }))
    }
}

impl TaskRunner for ScriptedRunner {
    async fn run(
        &self,
        request: TaskRequest,
        credential: SecretString,
    ) -> Result<TaskRun, TaskError> {
        self.requests
            .lock()
            .unwrap()
            .push((request, credential.expose_secret().to_string()));
        match &self.script {
            Script::Succeed(run) => Ok(run.clone()),
            Script::Fail(err) => Err(err.clone()),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TaskError::new(ErrorKind::TaskExecutionFailed, "unreachable"))
            }
            Script::Panic => panic!("runner exploded"),
        }
    }
}
