//! Human-visible commit status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::{TaskResult, TerminalResult};

/// Longest description the status sink accepts.
pub const MAX_DESCRIPTION_LEN: usize = 140;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Pending,
    Success,
    Failure,
    Error,
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusState::Pending => write!(f, "pending"),
            StatusState::Success => write!(f, "success"),
            StatusState::Failure => write!(f, "failure"),
            StatusState::Error => write!(f, "error"),
        }
    }
}

/// One status publication. Serializes to the sink's body shape
/// `{state, target_url, description, context}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    state: StatusState,
    target_url: String,
    description: String,
    context: String,
}

impl StatusUpdate {
    /// Build an update; the description is cut to [`MAX_DESCRIPTION_LEN`].
    pub fn new(
        state: StatusState,
        target_url: impl Into<String>,
        description: &str,
        context: impl Into<String>,
    ) -> Self {
        Self {
            state,
            target_url: target_url.into(),
            description: truncate_description(description),
            context: context.into(),
        }
    }

    pub fn pending(target_url: impl Into<String>, context: impl Into<String>) -> Self {
        Self::new(StatusState::Pending, target_url, "Check queued", context)
    }

    /// Map a terminal result to its status.
    ///
    /// Worker failures carry the error kind and cause in the description;
    /// engine-side failures (the worker never reported) map to `error`.
    pub fn for_result(
        result: &TerminalResult,
        target_url: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        match result {
            TerminalResult::Task(TaskResult::Success { output }) => {
                let short: String = output.revision.chars().take(7).collect();
                let description = if short.is_empty() {
                    "Check passed".to_string()
                } else {
                    format!("Check passed at {short}")
                };
                Self::new(StatusState::Success, target_url, &description, context)
            }
            TerminalResult::Task(TaskResult::Failure { error_kind, cause }) => Self::new(
                StatusState::Failure,
                target_url,
                &format!("Check failed ({error_kind}): {cause}"),
                context,
            ),
            TerminalResult::Engine(failure) => {
                let description = match &failure.cause {
                    Some(cause) => format!("Check errored ({}): {cause}", failure.error),
                    None => format!("Check errored ({})", failure.error),
                };
                Self::new(StatusState::Error, target_url, &description, context)
            }
        }
    }

    pub fn state(&self) -> StatusState {
        self.state
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

fn truncate_description(description: &str) -> String {
    let single_line = description.replace(['\r', '\n'], " ");
    if single_line.chars().count() <= MAX_DESCRIPTION_LEN {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(MAX_DESCRIPTION_LEN - 3).collect();
    cut.push_str("...");
    cut
}
