//! Fire-and-forget worker invocation over HTTP.
//!
//! The worker endpoint is expected to acknowledge (`202 Accepted`) before it
//! runs the task, so the request timeout only bounds the hand-off.

use std::time::Duration;

use hookflow_core::port::invoker::{AsyncInvoker, Invocation};
use hookflow_types::error::InvokeError;
use hookflow_types::execution::WorkerPayload;

const MAX_REASON_LEN: usize = 512;

pub struct HttpInvoker {
    client: reqwest::Client,
    invoke_url: String,
}

impl HttpInvoker {
    pub fn new(invoke_url: impl Into<String>, timeout: Duration) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InvokeError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            invoke_url: invoke_url.into(),
        })
    }
}

impl AsyncInvoker for HttpInvoker {
    async fn invoke(&self, payload: WorkerPayload) -> Result<Invocation, InvokeError> {
        let body = serde_json::to_vec(&payload).map_err(|e| InvokeError::Encode(e.to_string()))?;

        let response = self
            .client
            .post(&self.invoke_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| InvokeError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(Invocation::Accepted);
        }

        let reason = response.text().await.unwrap_or_default();
        Ok(Invocation::Rejected {
            status: status.as_u16(),
            reason: reason.chars().take(MAX_REASON_LEN).collect(),
        })
    }
}
