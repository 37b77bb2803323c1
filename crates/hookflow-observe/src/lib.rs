//! Observability setup for hookflow: structured logging with optional
//! OpenTelemetry span export.

pub mod tracing_setup;
