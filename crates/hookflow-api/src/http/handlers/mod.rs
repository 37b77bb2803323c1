//! Route handlers.

pub mod dispatch;
pub mod report;
pub mod webhook;
pub mod worker;

use axum::http::HeaderMap;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller-supplied `X-Request-Id`, or a fresh time-ordered id.
pub fn request_id(headers: &HeaderMap) -> String {
    header(headers, REQUEST_ID_HEADER)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
