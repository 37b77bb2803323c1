//! Pipeline services and port trait definitions for hookflow.
//!
//! This crate defines the "ports" (collaborator traits) that the
//! infrastructure layer implements, and the four services that make up the
//! callback-token pipeline: intake, dispatcher, worker and status reporter.
//! It depends only on `hookflow-types` -- never on `hookflow-infra` or any
//! HTTP/process crate.

pub mod port;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
