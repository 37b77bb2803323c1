//! Infrastructure layer for hookflow.
//!
//! Contains implementations of the port traits defined in `hookflow-core`:
//! HTTP and in-process workflow engines, worker invokers, secret providers
//! (environment, file, OS keychain), the GitHub status sink and the git task
//! runner. Also hosts the config loader and webhook signature verification.

pub mod config;
pub mod engine;
pub mod invoker;
pub mod keychain;
pub mod secret;
pub mod status;
pub mod task;
pub mod webhook;
