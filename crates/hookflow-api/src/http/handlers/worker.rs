//! Worker route: `POST /v1/worker`.
//!
//! Acknowledges with `202 Accepted` and runs the task on a spawned task; the
//! outcome goes back to the engine through the continuation token.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::json;

use hookflow_core::service::worker::WorkerInput;
use hookflow_types::task::{ErrorKind, TaskError};

use crate::http::error::{AppError, RequestError};
use crate::http::handlers::request_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /v1/worker - Fire-and-forget worker invocation.
pub async fn invoke_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), RequestError> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|e| AppError::MalformedBody {
            code: "MALFORMED_PAYLOAD",
            message: e.to_string(),
        }
        .for_request(&request_id))?;

    let worker = Arc::clone(&state.worker);
    match WorkerInput::from_json(value) {
        WorkerInput::MissingToken => {
            tracing::warn!(%request_id, "worker invoked without continuation token");
            return Err(AppError::MissingToken.for_request(&request_id));
        }
        WorkerInput::Unusable { token, cause } => {
            tokio::spawn(async move {
                worker
                    .reject(token, TaskError::new(ErrorKind::UnresolvableSource, cause))
                    .await;
            });
        }
        WorkerInput::Ready(payload) => {
            tokio::spawn(async move {
                worker.handle(payload).await;
            });
        }
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(json!({ "status": "accepted" }), request_id, elapsed)),
    ))
}
