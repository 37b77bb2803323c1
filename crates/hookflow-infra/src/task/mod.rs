//! Domain task runners.

pub mod git;

pub use git::GitTaskRunner;
