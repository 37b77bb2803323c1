//! HTTP layer for the bridge.
//!
//! Axum routes with an envelope response format and request tracing.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
