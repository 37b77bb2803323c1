//! Workflow execution service port.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookflow_types::error::EngineError;
use hookflow_types::event::Event;
use hookflow_types::execution::{ContinuationToken, ExecutionHandle};
use hookflow_types::task::{ErrorKind, TaskOutput};

/// The external engine that holds workflow state between dispatch and
/// callback.
///
/// Implementations must make `start_execution` idempotent by name: starting
/// a name that is already running returns the existing handle.
pub trait WorkflowEngine: Send + Sync {
    /// Start (or reuse) the execution called `name` with `input`.
    fn start_execution(
        &self,
        name: &str,
        input: &Event,
    ) -> impl Future<Output = Result<ExecutionHandle, EngineError>> + Send;

    /// Resume the paused step with a success output. Consumes the token.
    fn complete_continuation(
        &self,
        token: ContinuationToken,
        output: &TaskOutput,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Resume the paused step with a failure. Consumes the token.
    fn fail_continuation(
        &self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Stop every running execution started for `subject` except the one
    /// named `keep`, recording `cause`. Returns how many were stopped.
    fn stop_superseded(
        &self,
        subject: &str,
        keep: &str,
        cause: &str,
    ) -> impl Future<Output = Result<usize, EngineError>> + Send;
}

/// Object-safe version of [`WorkflowEngine`] with boxed futures.
pub trait WorkflowEngineDyn: Send + Sync {
    fn start_execution_boxed<'a>(
        &'a self,
        name: &'a str,
        input: &'a Event,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionHandle, EngineError>> + Send + 'a>>;

    fn complete_continuation_boxed<'a>(
        &'a self,
        token: ContinuationToken,
        output: &'a TaskOutput,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn fail_continuation_boxed<'a>(
        &'a self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;

    fn stop_superseded_boxed<'a>(
        &'a self,
        subject: &'a str,
        keep: &'a str,
        cause: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<usize, EngineError>> + Send + 'a>>;
}

impl<T: WorkflowEngine> WorkflowEngineDyn for T {
    fn start_execution_boxed<'a>(
        &'a self,
        name: &'a str,
        input: &'a Event,
    ) -> Pin<Box<dyn Future<Output = Result<ExecutionHandle, EngineError>> + Send + 'a>> {
        Box::pin(self.start_execution(name, input))
    }

    fn complete_continuation_boxed<'a>(
        &'a self,
        token: ContinuationToken,
        output: &'a TaskOutput,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.complete_continuation(token, output))
    }

    fn fail_continuation_boxed<'a>(
        &'a self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.fail_continuation(token, error_kind, cause))
    }

    fn stop_superseded_boxed<'a>(
        &'a self,
        subject: &'a str,
        keep: &'a str,
        cause: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<usize, EngineError>> + Send + 'a>> {
        Box::pin(self.stop_superseded(subject, keep, cause))
    }
}

/// Type-erased engine shared by intake and worker.
pub type DynWorkflowEngine = Arc<dyn WorkflowEngineDyn>;
