//! Axum router configuration with middleware.
//!
//! `/webhook` faces the event source; `/v1/*` faces the workflow engine and
//! the worker invoker. Middleware: request tracing.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let engine_routes = Router::new()
        .route("/dispatch", post(handlers::dispatch::dispatch))
        .route("/worker", post(handlers::worker::invoke_worker))
        .route("/report", post(handlers::report::report));

    Router::new()
        .route("/webhook", post(handlers::webhook::receive_webhook))
        .nest("/v1", engine_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Liveness and wiring summary.
async fn health_check(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.config.engine.mode,
        "worker": state.config.worker.mode,
        "signatureRequired": state.webhook_secret.is_some(),
    }))
}
