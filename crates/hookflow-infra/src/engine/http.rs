//! HTTP client for an external workflow execution service.
//!
//! Wire contract:
//! - `POST {base}/executions` `{name, input, subject?}` -> `{executionId, executionRef}`;
//!   `409 Conflict` carries the handle of the already-running execution.
//! - `POST {base}/executions/stop` `{subject, keep, error, cause}` -> `{stopped}`;
//!   stops running executions started with `subject` other than `keep`.
//! - `POST {base}/continuations/success` `{token, output}`
//! - `POST {base}/continuations/failure` `{token, error, cause}`;
//!   `404` / `410` mean the token is unknown or already consumed.

use std::time::Duration;

use hookflow_core::port::engine::WorkflowEngine;
use hookflow_types::error::EngineError;
use hookflow_types::event::Event;
use hookflow_types::execution::{ContinuationToken, ExecutionHandle};
use hookflow_types::task::{ErrorKind, TaskOutput};
use hookflow_types::task::EngineFailure;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub struct HttpWorkflowEngine {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct StartExecutionBody<'a> {
    name: &'a str,
    input: &'a Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
}

#[derive(Serialize)]
struct StopBody<'a> {
    subject: &'a str,
    keep: &'a str,
    error: &'a str,
    cause: &'a str,
}

#[derive(Deserialize)]
struct StopResponse {
    stopped: usize,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    token: &'a str,
    output: &'a TaskOutput,
}

#[derive(Serialize)]
struct FailureBody<'a> {
    token: &'a str,
    error: ErrorKind,
    cause: &'a str,
}

impl HttpWorkflowEngine {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, EngineError> {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(e.without_url().to_string()))
    }

    async fn present<B: Serialize>(&self, path: &str, body: &B) -> Result<(), EngineError> {
        let response = self.post(path, body).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(EngineError::TokenConsumed),
            status => Err(rejected(status, response).await),
        }
    }
}

async fn rejected(status: StatusCode, response: reqwest::Response) -> EngineError {
    EngineError::Rejected {
        status: status.as_u16(),
        message: response.text().await.unwrap_or_default(),
    }
}

impl WorkflowEngine for HttpWorkflowEngine {
    async fn start_execution(
        &self,
        name: &str,
        input: &Event,
    ) -> Result<ExecutionHandle, EngineError> {
        let response = self
            .post(
                "executions",
                &StartExecutionBody {
                    name,
                    input,
                    subject: input.change_subject(),
                },
            )
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            if status == StatusCode::CONFLICT {
                tracing::info!(execution_id = %name, "execution already running, reusing");
            }
            return response
                .json::<ExecutionHandle>()
                .await
                .map_err(|e| EngineError::InvalidResponse(e.to_string()));
        }

        Err(rejected(status, response).await)
    }

    async fn complete_continuation(
        &self,
        token: ContinuationToken,
        output: &TaskOutput,
    ) -> Result<(), EngineError> {
        let body = SuccessBody {
            token: token.expose(),
            output,
        };
        self.present("continuations/success", &body).await
    }

    async fn fail_continuation(
        &self,
        token: ContinuationToken,
        error_kind: ErrorKind,
        cause: &str,
    ) -> Result<(), EngineError> {
        let body = FailureBody {
            token: token.expose(),
            error: error_kind,
            cause,
        };
        self.present("continuations/failure", &body).await
    }

    async fn stop_superseded(
        &self,
        subject: &str,
        keep: &str,
        cause: &str,
    ) -> Result<usize, EngineError> {
        let body = StopBody {
            subject,
            keep,
            error: EngineFailure::SUPERSEDED,
            cause,
        };
        let response = self.post("executions/stop", &body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status, response).await);
        }
        response
            .json::<StopResponse>()
            .await
            .map(|r| r.stopped)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))
    }
}
