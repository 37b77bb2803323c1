//! Pipeline services.
//!
//! Each service is one hop of the pipeline and is invoked independently by
//! its HTTP handler (or by the in-process engine). Services hold only
//! immutable settings and shared, stateless ports.

pub mod dispatcher;
pub mod intake;
pub mod reporter;
pub mod secret;
pub mod source;
pub mod worker;
