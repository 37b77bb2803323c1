//! Status sink implementations.

pub mod github;

pub use github::GitHubStatusSink;
