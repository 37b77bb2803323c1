//! Secret provider implementations.
//!
//! - `env`: environment variables (`env:NAME`)
//! - `file`: mounted secret files (`file:/path`)
//! - `chain`: chain builder wiring all providers together
//!
//! The OS keychain provider lives in [`crate::keychain`].

pub mod chain;
pub mod env;
pub mod file;
