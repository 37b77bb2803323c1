//! Dispatcher: forward a continuation token and its event to the worker.

use hookflow_types::error::InvokeError;
use hookflow_types::execution::{DispatchRequest, WorkerPayload};
use thiserror::Error;

use crate::port::invoker::{DynAsyncInvoker, Invocation};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("continuation token is missing or blank")]
    MissingToken,

    #[error("worker rejected the invocation ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("worker invocation failed: {0}")]
    InvokeFailed(#[from] InvokeError),
}

pub struct DispatcherService {
    invoker: DynAsyncInvoker,
}

impl DispatcherService {
    pub fn new(invoker: DynAsyncInvoker) -> Self {
        Self { invoker }
    }

    /// Hand the token and the full event to the worker.
    ///
    /// Returns as soon as the invocation is accepted; the worker reports its
    /// outcome to the engine on its own. Safe to call again with the same
    /// token if the engine retries the step.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        let token = match request.continuation_token {
            Some(token) if !token.is_blank() => token,
            _ => {
                tracing::warn!(
                    target_revision = request.event.target_revision(),
                    "dispatch without continuation token"
                );
                return Err(DispatchError::MissingToken);
            }
        };

        let source = request.event.source_location().to_string();
        let revision = request.event.target_revision().to_string();
        let payload = WorkerPayload::new(token, request.event);

        match self.invoker.invoke_boxed(payload).await? {
            Invocation::Accepted => {
                tracing::info!(%source, %revision, "worker invocation accepted");
                Ok(())
            }
            Invocation::Rejected { status, reason } => {
                tracing::error!(
                    %source,
                    %revision,
                    status,
                    reason = %reason,
                    "worker invocation rejected"
                );
                Err(DispatchError::Rejected { status, reason })
            }
        }
    }
}
