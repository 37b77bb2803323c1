//! Intake route: `POST /webhook`.
//!
//! Verifies the optional HMAC signature, starts (or reuses) the execution for
//! the event and answers immediately. With a remote engine the `pending`
//! status is published before answering, so the engine cannot report a
//! terminal status ahead of it. The local engine publishes it itself.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::json;

use hookflow_core::service::intake::Delivery;
use hookflow_infra::webhook::signature::{SIGNATURE_HEADER, verify_signature};

use crate::http::error::{AppError, RequestError};
use crate::http::handlers::{header, request_id};
use crate::http::response::ApiResponse;
use crate::state::AppState;

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// POST /webhook - Accept a source-control event.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<serde_json::Value>>, RequestError> {
    let start = Instant::now();
    let request_id = request_id(&headers);

    if let Some(secret) = &state.webhook_secret {
        verify_signature(secret, &body, header(&headers, SIGNATURE_HEADER)).map_err(|e| {
            tracing::warn!(%request_id, error = %e, "webhook signature rejected");
            AppError::Unauthorized(e.to_string()).for_request(&request_id)
        })?;
    }

    let admission = state
        .intake
        .accept(Delivery {
            kind: header(&headers, EVENT_HEADER),
            delivery_id: header(&headers, DELIVERY_HEADER),
            request_id: &request_id,
            body: &body,
        })
        .await
        .map_err(|e| AppError::from(e).for_request(&request_id))?;

    if state.pending_at_intake {
        if let Err(e) = state
            .reporter
            .report_pending(&admission.event, &admission.handle)
            .await
        {
            tracing::warn!(
                execution_id = %admission.handle.execution_id,
                error = %e,
                "pending status not published"
            );
        }
    }

    let handle = admission.handle;
    let link = state.reporter.target_url(&handle);
    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(
        json!({
            "executionId": handle.execution_id,
            "executionRef": handle.execution_ref,
            "status": "started",
        }),
        request_id,
        elapsed,
    )
    .with_link("execution", &link);

    Ok(Json(resp))
}
