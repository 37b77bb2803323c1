use thiserror::Error;

/// Errors raised while parsing and validating an inbound event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid {field}: '{value}' is not a 4-64 character hex commit id")]
    InvalidRevision { field: &'static str, value: String },

    #[error("invalid source location: '{0}'")]
    InvalidSource(String),

    #[error("unsupported event kind '{0}'")]
    UnsupportedKind(String),
}

/// Errors from the workflow execution service.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("workflow engine unavailable: {0}")]
    Unavailable(String),

    #[error("workflow engine rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("continuation token is unknown or already consumed")]
    TokenConsumed,

    #[error("invalid response from workflow engine: {0}")]
    InvalidResponse(String),
}

/// Errors from the asynchronous worker invoker.
///
/// A worker that answers with a non-2xx status is not an error here; that is
/// reported as a rejected invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("worker invocation transport error: {0}")]
    Transport(String),

    #[error("worker payload could not be encoded: {0}")]
    Encode(String),
}

/// Errors related to secret resolution.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("secret provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("invalid secret reference '{0}'")]
    InvalidReference(String),
}

/// Errors from publishing a status update to the external sink.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("status sink transport error: {0}")]
    Transport(String),

    #[error("status sink rejected the update ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid callback sink '{0}'")]
    InvalidSink(String),

    #[error("callback sink '{0}' is outside the configured status API")]
    UntrustedSink(String),
}

/// Errors related to loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
