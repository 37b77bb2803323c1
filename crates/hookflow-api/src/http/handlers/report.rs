//! Terminal notification route: `POST /v1/report`.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;

use hookflow_types::execution::TerminalNotification;

use crate::http::error::{AppError, RequestError};
use crate::http::handlers::request_id;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /v1/report - Publish the commit status for a finished execution.
pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<serde_json::Value>>, RequestError> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    let notification: TerminalNotification =
        serde_json::from_slice(&body).map_err(|e| AppError::MalformedBody {
            code: "MALFORMED_NOTIFICATION",
            message: e.to_string(),
        }
        .for_request(&request_id))?;

    let update = state
        .reporter
        .report(notification)
        .await
        .map_err(|e| AppError::from(e).for_request(&request_id))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(
            json!({
                "state": update.state(),
                "targetUrl": update.target_url(),
                "description": update.description(),
                "context": update.context(),
            }),
            request_id,
            elapsed,
        )
        .with_link("execution", update.target_url()),
    ))
}
