//! hookflow HTTP bridge.
//!
//! Exposes the four pipeline components as routes:
//! - `POST /webhook`: intake of source-control events
//! - `POST /v1/dispatch`: engine step that hands the continuation token to the worker
//! - `POST /v1/worker`: fire-and-forget worker invocation
//! - `POST /v1/report`: engine terminal notification, published as a commit status

pub mod cli;
pub mod http;
pub mod state;
