//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use hookflow_core::service::dispatcher::DispatchError;
use hookflow_core::service::intake::IntakeError;
use hookflow_core::service::reporter::ReportError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Intake(IntakeError),
    Dispatch(DispatchError),
    Report(ReportError),
    /// Worker invocation without a usable continuation token.
    MissingToken,
    /// Body is not the JSON shape the route expects.
    MalformedBody { code: &'static str, message: String },
    /// Webhook signature failure.
    Unauthorized(String),
}

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        AppError::Intake(e)
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        AppError::Dispatch(e)
    }
}

impl From<ReportError> for AppError {
    fn from(e: ReportError) -> Self {
        AppError::Report(e)
    }
}

impl AppError {
    /// Attach the id of the request that failed, for the envelope's `meta`.
    pub fn for_request(self, request_id: &str) -> RequestError {
        RequestError {
            request_id: request_id.to_string(),
            error: self,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Intake(e @ IntakeError::MalformedEvent(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_EVENT", e.to_string())
            }
            AppError::Intake(e @ IntakeError::StartFailed(_)) => {
                (StatusCode::BAD_GATEWAY, "ENGINE_UNAVAILABLE", e.to_string())
            }
            AppError::Dispatch(e @ DispatchError::MissingToken) => {
                (StatusCode::BAD_REQUEST, "MISSING_TOKEN", e.to_string())
            }
            AppError::Dispatch(e) => (StatusCode::BAD_GATEWAY, "WORKER_UNAVAILABLE", e.to_string()),
            AppError::Report(e @ ReportError::MissingExecution) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_NOTIFICATION", e.to_string())
            }
            AppError::Report(e @ ReportError::CredentialUnavailable(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CREDENTIAL_UNAVAILABLE", e.to_string())
            }
            AppError::Report(e @ ReportError::DeliveryFailed(_)) => {
                (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED", e.to_string())
            }
            AppError::MissingToken => (
                StatusCode::BAD_REQUEST,
                "MISSING_TOKEN",
                "continuation token is missing or blank".to_string(),
            ),
            AppError::MalformedBody { code, message } => {
                (StatusCode::BAD_REQUEST, *code, message.clone())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        }
    }
}

/// An [`AppError`] tied to the request it answers.
#[derive(Debug)]
pub struct RequestError {
    request_id: String,
    error: AppError,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.error.parts();
        (status, Json(ApiResponse::error(code, &message, self.request_id))).into_response()
    }
}
