//! Worker: run the domain task and present the continuation token once.

use std::sync::Arc;
use std::time::Duration;

use hookflow_types::event::Event;
use hookflow_types::execution::{ContinuationToken, WorkerPayload};
use hookflow_types::secret::SecretReference;
use hookflow_types::task::{ErrorKind, TaskError, TaskOutput, TaskResult};

use crate::port::engine::DynWorkflowEngine;
use crate::port::task::{DynTaskRunner, TaskRequest};
use crate::service::secret::SecretStore;
use crate::service::source::{clone_url, verify_revision};

/// Immutable worker settings taken from configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Credential used for cloning.
    pub credential: SecretReference,
    /// Wall-clock bound on the whole task.
    pub task_timeout: Duration,
    /// Host for `owner/repo` sources.
    pub git_base_url: String,
}

/// A raw worker invocation, sorted by what can still be done with it.
#[derive(Debug)]
pub enum WorkerInput {
    Ready(WorkerPayload),
    /// The token is usable but the event is not; the token must still be
    /// presented with a failure.
    Unusable {
        token: ContinuationToken,
        cause: String,
    },
    /// Nothing to present to; the engine's step timeout is the backstop.
    MissingToken,
}

impl WorkerInput {
    pub fn from_json(value: serde_json::Value) -> Self {
        let token = value
            .get("continuationToken")
            .or_else(|| value.get("taskToken"))
            .and_then(serde_json::Value::as_str)
            .map(ContinuationToken::new)
            .filter(|token| !token.is_blank());

        let Some(token) = token else {
            return WorkerInput::MissingToken;
        };

        match serde_json::from_value::<Event>(value) {
            Ok(event) => WorkerInput::Ready(WorkerPayload::new(token, event)),
            Err(e) => WorkerInput::Unusable {
                token,
                cause: e.to_string(),
            },
        }
    }
}

/// What one invocation ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub result: TaskResult,
    /// Whether the engine accepted the presentation.
    pub presented: bool,
}

pub struct WorkerService {
    engine: DynWorkflowEngine,
    secrets: Arc<SecretStore>,
    runner: DynTaskRunner,
    settings: WorkerSettings,
}

impl WorkerService {
    pub fn new(
        engine: DynWorkflowEngine,
        secrets: Arc<SecretStore>,
        runner: DynTaskRunner,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            engine,
            secrets,
            runner,
            settings,
        }
    }

    /// Run the task for `payload` and present its token exactly once.
    ///
    /// Every failure, including a panicking runner, becomes a `Failure`
    /// presentation. A rejected presentation is logged and not retried.
    pub async fn handle(&self, payload: WorkerPayload) -> WorkerReport {
        let WorkerPayload {
            continuation_token,
            event,
        } = payload;
        let subject = format!("{}-{}", event.repository_name(), event.short_revision());

        let result = match self.perform(&event, &subject).await {
            Ok(output) => TaskResult::Success { output },
            Err(e) => {
                tracing::warn!(
                    %subject,
                    error_kind = %e.kind,
                    cause = %e.cause,
                    "task failed"
                );
                e.into()
            }
        };

        let presented = self.present(continuation_token, &result, &subject).await;
        WorkerReport { result, presented }
    }

    /// Present a failure for a token whose event could not be used.
    pub async fn reject(&self, token: ContinuationToken, error: TaskError) -> WorkerReport {
        tracing::warn!(error_kind = %error.kind, cause = %error.cause, "unusable worker payload");
        let result: TaskResult = error.into();
        let presented = self.present(token, &result, "unknown").await;
        WorkerReport { result, presented }
    }

    async fn perform(&self, event: &Event, subject: &str) -> Result<TaskOutput, TaskError> {
        let credential = self
            .secrets
            .resolve(&self.settings.credential)
            .await
            .map_err(|e| TaskError::new(ErrorKind::CredentialUnavailable, e.to_string()))?;

        let request = TaskRequest {
            clone_url: clone_url(event.source_location(), &self.settings.git_base_url)?,
            target_revision: event.target_revision().to_string(),
            base_revision: event.base_revision().map(str::to_string),
            ignore_locals: event.ignore_locals(),
            label: subject.to_string(),
        };
        tracing::info!(%subject, clone_url = %request.clone_url, "task starting");

        // The run gets its own task so a panic surfaces as a JoinError and a
        // timeout can abort it (dropping any child processes).
        let runner = Arc::clone(&self.runner);
        let mut task = tokio::spawn(async move { runner.run_boxed(request, credential).await });

        let run = match tokio::time::timeout(self.settings.task_timeout, &mut task).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(join_error)) => {
                let cause = if join_error.is_panic() {
                    "task panicked".to_string()
                } else {
                    format!("task aborted: {join_error}")
                };
                return Err(TaskError::new(ErrorKind::TaskExecutionFailed, cause));
            }
            Err(_) => {
                task.abort();
                return Err(TaskError::new(
                    ErrorKind::Timeout,
                    format!(
                        "task exceeded {}s",
                        self.settings.task_timeout.as_secs_f64()
                    ),
                ));
            }
        };

        verify_revision(event.target_revision(), &run.checked_out_revision)?;

        tracing::info!(
            %subject,
            revision = %run.checked_out_revision,
            changed = run.changed_files.len(),
            built = run.built,
            "task succeeded"
        );
        Ok(TaskOutput {
            revision: run.checked_out_revision,
            changed_files: run.changed_files,
            built: run.built,
        })
    }

    async fn present(&self, token: ContinuationToken, result: &TaskResult, subject: &str) -> bool {
        let outcome = match result {
            TaskResult::Success { output } => {
                self.engine.complete_continuation_boxed(token, output).await
            }
            TaskResult::Failure { error_kind, cause } => {
                self.engine
                    .fail_continuation_boxed(token, *error_kind, cause)
                    .await
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!(%subject, success = result.is_success(), "continuation presented");
                true
            }
            Err(e) => {
                tracing::error!(%subject, error = %e, "continuation presentation failed, not retrying");
                false
            }
        }
    }
}
