//! In-process worker invocation.

use std::sync::Arc;

use hookflow_core::port::invoker::{AsyncInvoker, Invocation};
use hookflow_core::service::worker::WorkerService;
use hookflow_types::error::InvokeError;
use hookflow_types::execution::WorkerPayload;

/// Runs the worker on its own tokio task and returns immediately.
pub struct LocalInvoker {
    worker: Arc<WorkerService>,
}

impl LocalInvoker {
    pub fn new(worker: Arc<WorkerService>) -> Self {
        Self { worker }
    }
}

impl AsyncInvoker for LocalInvoker {
    async fn invoke(&self, payload: WorkerPayload) -> Result<Invocation, InvokeError> {
        let worker = Arc::clone(&self.worker);
        tokio::spawn(async move {
            let report = worker.handle(payload).await;
            tracing::debug!(
                success = report.result.is_success(),
                presented = report.presented,
                "local worker finished"
            );
        });
        Ok(Invocation::Accepted)
    }
}
