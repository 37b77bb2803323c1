//! Worker task outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of worker failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnresolvableSource,
    CredentialUnavailable,
    TaskExecutionFailed,
    VerificationMismatch,
    Timeout,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnresolvableSource => "UnresolvableSource",
            ErrorKind::CredentialUnavailable => "CredentialUnavailable",
            ErrorKind::TaskExecutionFailed => "TaskExecutionFailed",
            ErrorKind::VerificationMismatch => "VerificationMismatch",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified worker failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {cause}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub cause: String,
}

impl TaskError {
    pub fn new(kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }
}

/// What a successful task run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutput {
    /// The revision that was checked out and verified.
    pub revision: String,
    /// Changed files that matched the build filter.
    #[serde(default)]
    pub changed_files: Vec<String>,
    /// Whether the build command ran.
    #[serde(default)]
    pub built: bool,
}

/// Terminal result of one worker invocation, tagged by `status` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskResult {
    Success {
        output: TaskOutput,
    },
    Failure {
        #[serde(rename = "errorKind")]
        error_kind: ErrorKind,
        cause: String,
    },
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }
}

impl From<TaskError> for TaskResult {
    fn from(err: TaskError) -> Self {
        TaskResult::Failure {
            error_kind: err.kind,
            cause: err.cause,
        }
    }
}

/// Failure descriptor the engine supplies when the execution ended without
/// a task result (step timeout, dispatch failure, abort).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl EngineFailure {
    pub const TIMEOUT: &'static str = "States.Timeout";
    pub const TASK_FAILED: &'static str = "States.TaskFailed";
    /// A newer revision of the same change request replaced this execution.
    pub const SUPERSEDED: &'static str = "Superseded";

    pub fn new(error: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            cause: Some(cause.into()),
        }
    }
}

/// What the status reporter receives as `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TerminalResult {
    Task(TaskResult),
    Engine(EngineFailure),
}
