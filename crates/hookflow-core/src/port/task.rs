//! Domain task port: fetch a revision and run the build.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookflow_types::task::TaskError;
use secrecy::SecretString;

/// Everything the runner needs, already derived from the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Credential-free clone URL.
    pub clone_url: String,
    pub target_revision: String,
    pub base_revision: Option<String>,
    /// Append the configured ignore-locals flags to the build.
    pub ignore_locals: bool,
    /// Short human label for logs and temp directory names.
    pub label: String,
}

/// What the runner observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    /// Revision reported by the checkout after it finished.
    pub checked_out_revision: String,
    pub changed_files: Vec<String>,
    pub built: bool,
}

/// Runs the clone / checkout / build sequence.
///
/// Takes its inputs by value so the worker can move the run onto its own
/// task and bound it with a timeout.
pub trait TaskRunner: Send + Sync {
    fn run(
        &self,
        request: TaskRequest,
        credential: SecretString,
    ) -> impl Future<Output = Result<TaskRun, TaskError>> + Send;
}

/// Object-safe version of [`TaskRunner`] with boxed futures.
pub trait TaskRunnerDyn: Send + Sync {
    fn run_boxed(
        &self,
        request: TaskRequest,
        credential: SecretString,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRun, TaskError>> + Send + '_>>;
}

impl<T: TaskRunner> TaskRunnerDyn for T {
    fn run_boxed(
        &self,
        request: TaskRequest,
        credential: SecretString,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRun, TaskError>> + Send + '_>> {
        Box::pin(self.run(request, credential))
    }
}

pub type DynTaskRunner = Arc<dyn TaskRunnerDyn>;
