//! Engine step route: `POST /v1/dispatch`.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;

use hookflow_types::execution::DispatchRequest;

use crate::http::error::{AppError, RequestError};
use crate::http::handlers::request_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /v1/dispatch - Forward `{continuationToken, ...event}` to the worker.
///
/// Answers once the worker accepted the invocation. Any error status fails
/// the engine step immediately.
pub async fn dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<serde_json::Value>>, RequestError> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let request: DispatchRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::MalformedBody {
            code: "MALFORMED_EVENT",
            message: e.to_string(),
        }
        .for_request(&request_id))?;

    state
        .dispatcher
        .dispatch(request)
        .await
        .map_err(|e| AppError::from(e).for_request(&request_id))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        json!({ "status": "dispatched" }),
        request_id,
        elapsed,
    )))
}
