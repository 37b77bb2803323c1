//! Workflow engine implementations.
//!
//! - `http`: client for an external execution service
//! - `local`: in-process engine for single-binary operation

pub mod http;
pub mod local;

pub use http::HttpWorkflowEngine;
pub use local::{LocalEngine, LocalEngineDriver};
