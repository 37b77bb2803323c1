//! Inbound webhook authentication.

pub mod signature;

pub use signature::{SignatureError, sign_body, verify_signature};
