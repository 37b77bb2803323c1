//! Fire-and-forget worker invocation port.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hookflow_types::error::InvokeError;
use hookflow_types::execution::WorkerPayload;

/// Outcome of handing a payload to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// The worker accepted the payload; it has not necessarily started.
    Accepted,
    /// The worker side refused the payload.
    Rejected { status: u16, reason: String },
}

/// Hands a payload to the worker and returns once it was accepted, without
/// waiting for the task.
pub trait AsyncInvoker: Send + Sync {
    fn invoke(
        &self,
        payload: WorkerPayload,
    ) -> impl Future<Output = Result<Invocation, InvokeError>> + Send;
}

/// Object-safe version of [`AsyncInvoker`] with boxed futures.
pub trait AsyncInvokerDyn: Send + Sync {
    fn invoke_boxed(
        &self,
        payload: WorkerPayload,
    ) -> Pin<Box<dyn Future<Output = Result<Invocation, InvokeError>> + Send + '_>>;
}

impl<T: AsyncInvoker> AsyncInvokerDyn for T {
    fn invoke_boxed(
        &self,
        payload: WorkerPayload,
    ) -> Pin<Box<dyn Future<Output = Result<Invocation, InvokeError>> + Send + '_>> {
        Box::pin(self.invoke(payload))
    }
}

pub type DynAsyncInvoker = Arc<dyn AsyncInvokerDyn>;
