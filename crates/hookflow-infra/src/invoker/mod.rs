//! Worker invokers.
//!
//! - `http`: POST the payload to a worker endpoint and return on acceptance
//! - `local`: run the worker on a spawned task inside this process

pub mod http;
pub mod local;

pub use http::HttpInvoker;
pub use local::LocalInvoker;
