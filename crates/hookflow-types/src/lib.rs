//! Shared domain types for hookflow.
//!
//! This crate contains the data that crosses component boundaries:
//! the normalized inbound `Event`, execution handles and continuation
//! tokens, task results, status updates, configuration and the error
//! enums shared by the core and infrastructure layers.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod secret;
pub mod status;
pub mod task;
