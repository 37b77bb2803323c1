//! Execution identity and the payloads exchanged between pipeline hops.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::task::TerminalResult;

/// Upper bound on execution names accepted by workflow engines.
pub const MAX_EXECUTION_NAME_LEN: usize = 80;

const MAX_UNIQUENESS_LEN: usize = 40;

/// Reference to a started workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHandle {
    /// The execution name, `{repo}-{revision}-{uniqueness}`.
    pub execution_id: String,
    /// Opaque engine reference used to build the human-viewable link.
    pub execution_ref: String,
}

/// Derive the execution name for `event`.
///
/// `uniqueness` is the delivery id when the transport supplied one, else a
/// request-scoped id. Names are restricted to `[A-Za-z0-9_-]` and capped at
/// [`MAX_EXECUTION_NAME_LEN`]; the repository part is shortened first.
pub fn execution_name(event: &Event, uniqueness: &str) -> String {
    let uniqueness: String = sanitize(uniqueness).chars().take(MAX_UNIQUENESS_LEN).collect();
    let revision = event.short_revision();
    let budget = MAX_EXECUTION_NAME_LEN - uniqueness.len() - revision.len() - 2;
    let repo: String = sanitize(event.repository_name()).chars().take(budget).collect();
    format!("{repo}-{revision}-{uniqueness}")
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Single-use engine credential that resumes a paused execution.
///
/// Deliberately not `Clone`: presenting the token to the engine consumes it.
/// `Debug` and `Display` never show the value.
#[derive(PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Access the raw token for the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken(\"***\")")
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Engine step input for the dispatcher: `{continuationToken, ...event}`.
///
/// `taskToken` is accepted as an alias for engines that use that name.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    #[serde(default, alias = "taskToken", skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<ContinuationToken>,
    #[serde(flatten)]
    pub event: Event,
}

/// Fire-and-forget worker invocation payload: `{continuationToken, ...event}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPayload {
    #[serde(alias = "taskToken")]
    pub continuation_token: ContinuationToken,
    #[serde(flatten)]
    pub event: Event,
}

impl WorkerPayload {
    pub fn new(continuation_token: ContinuationToken, event: Event) -> Self {
        Self {
            continuation_token,
            event,
        }
    }
}

/// Terminal-state notification for the status reporter:
/// `{...event, execution, result}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalNotification {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionHandle>,
    pub result: TerminalResult,
}
