//! Port trait definitions.
//!
//! Each collaborator is a trait using RPITIT (`impl Future + Send`) plus an
//! object-safe `...Dyn` twin with boxed futures. A blanket impl covers every
//! implementor, so adapters only implement the plain trait and services hold
//! `Arc<dyn ...Dyn>` for runtime selection.

pub mod engine;
pub mod invoker;
pub mod secret;
pub mod status;
pub mod task;

pub use engine::{DynWorkflowEngine, WorkflowEngine, WorkflowEngineDyn};
pub use invoker::{AsyncInvoker, AsyncInvokerDyn, DynAsyncInvoker, Invocation};
pub use secret::{DynSecretProvider, SecretProvider, SecretProviderDyn};
pub use status::{DynStatusSink, StatusSink, StatusSinkDyn};
pub use task::{DynTaskRunner, TaskRequest, TaskRun, TaskRunner, TaskRunnerDyn};
