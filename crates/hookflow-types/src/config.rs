//! Bridge configuration types.
//!
//! `BridgeConfig` represents the `config.toml` that wires the bridge to its
//! collaborators. Every field has a default so an empty file (or no file)
//! yields a runnable single-binary setup with the in-process engine.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::secret::SecretReference;

/// Top-level configuration, loaded once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

impl BridgeConfig {
    /// Check the values serde cannot: URLs, timeouts, templates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(invalid("server.host", "must not be empty"));
        }

        if self.engine.mode == EngineMode::Http {
            check_url("engine.base_url", &self.engine.base_url)?;
        }
        check_url("engine.console_url_template", &self.engine.console_url_template)?;
        let template = &self.engine.console_url_template;
        if !template.contains("{execution_ref}") && !template.contains("{execution_id}") {
            return Err(invalid(
                "engine.console_url_template",
                "must contain {execution_ref} or {execution_id}",
            ));
        }
        check_positive("engine.step_timeout_secs", self.engine.step_timeout_secs)?;
        check_positive("engine.request_timeout_secs", self.engine.request_timeout_secs)?;
        if self.engine.state_machine.trim().is_empty() {
            return Err(invalid("engine.state_machine", "must not be empty"));
        }

        if self.worker.mode == InvokerMode::Http {
            check_url("worker.invoke_url", &self.worker.invoke_url)?;
        }
        check_positive("worker.task_timeout_secs", self.worker.task_timeout_secs)?;
        check_positive("worker.invoke_timeout_secs", self.worker.invoke_timeout_secs)?;
        check_url("worker.git_base_url", &self.worker.git_base_url)?;
        if self.worker.git_program.trim().is_empty() {
            return Err(invalid("worker.git_program", "must not be empty"));
        }
        // The worker's own deadline must fire before the engine gives up on it.
        if self.worker.task_timeout_secs >= self.engine.step_timeout_secs {
            return Err(invalid(
                "worker.task_timeout_secs",
                "must be shorter than engine.step_timeout_secs",
            ));
        }

        if self.build.command.iter().any(|part| part.trim().is_empty()) {
            return Err(invalid("build.command", "must not contain empty arguments"));
        }

        if self.status.context.trim().is_empty() {
            return Err(invalid("status.context", "must not be empty"));
        }
        check_url("status.api_base_url", &self.status.api_base_url)?;
        check_positive("status.request_timeout_secs", self.status.request_timeout_secs)?;

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("'{value}' is not an http(s) URL"),
        }),
    }
}

fn check_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8780
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which workflow engine the bridge talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// In-process engine driven by this binary.
    #[default]
    Local,
    /// External engine reached over HTTP.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: EngineMode,
    /// Base URL of an external engine (`mode = "http"`).
    #[serde(default = "default_engine_base_url")]
    pub base_url: String,
    /// Link shown next to each status. Placeholders: `{execution_ref}`,
    /// `{execution_id}`.
    #[serde(default = "default_console_url_template")]
    pub console_url_template: String,
    /// State machine name used by the local engine in execution refs.
    #[serde(default = "default_state_machine")]
    pub state_machine: String,
    /// How long the engine waits for a continuation before timing out.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_engine_base_url() -> String {
    "http://127.0.0.1:8781".to_string()
}

fn default_console_url_template() -> String {
    "http://127.0.0.1:8780/executions/{execution_ref}".to_string()
}

fn default_state_machine() -> String {
    "hookflow".to_string()
}

fn default_step_timeout_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl EngineConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::default(),
            base_url: default_engine_base_url(),
            console_url_template: default_console_url_template(),
            state_machine: default_state_machine(),
            step_timeout_secs: default_step_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// How the dispatcher reaches the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokerMode {
    /// Spawn the worker on this process's runtime.
    #[default]
    Local,
    /// POST the payload to `invoke_url`.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub mode: InvokerMode,
    #[serde(default = "default_invoke_url")]
    pub invoke_url: String,
    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,
    /// Wall-clock bound on clone, checkout and build together.
    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,
    #[serde(default = "default_git_program")]
    pub git_program: String,
    /// Host that `owner/repo` sources are cloned from.
    #[serde(default = "default_git_base_url")]
    pub git_base_url: String,
    /// Parent directory for temporary clones; the system temp dir if unset.
    #[serde(default)]
    pub workdir: Option<PathBuf>,
}

fn default_invoke_url() -> String {
    "http://127.0.0.1:8780/v1/worker".to_string()
}

fn default_invoke_timeout_secs() -> u64 {
    10
}

fn default_task_timeout_secs() -> u64 {
    900
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_git_base_url() -> String {
    "https://github.com".to_string()
}

impl WorkerConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            mode: InvokerMode::default(),
            invoke_url: default_invoke_url(),
            invoke_timeout_secs: default_invoke_timeout_secs(),
            task_timeout_secs: default_task_timeout_secs(),
            git_program: default_git_program(),
            git_base_url: default_git_base_url(),
            workdir: None,
        }
    }
}

/// The build step run after checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Program and leading arguments; empty disables the build step.
    #[serde(default)]
    pub command: Vec<String>,
    /// Flags appended after the changed files.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Flags appended when the event sets `ignoreLocals`.
    #[serde(default = "default_ignore_locals_args")]
    pub ignore_locals_args: Vec<String>,
    #[serde(default = "default_changed_prefix")]
    pub changed_prefix: String,
    #[serde(default = "default_changed_suffix")]
    pub changed_suffix: String,
}

fn default_ignore_locals_args() -> Vec<String> {
    vec!["--ignore-locals".to_string()]
}

fn default_changed_prefix() -> String {
    "config".to_string()
}

fn default_changed_suffix() -> String {
    ".yaml".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            extra_args: Vec::new(),
            ignore_locals_args: default_ignore_locals_args(),
            changed_prefix: default_changed_prefix(),
            changed_suffix: default_changed_suffix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Credential for cloning and for posting statuses.
    #[serde(default = "default_source_token")]
    pub source_token: SecretReference,
    /// When set, `/webhook` requires a valid `X-Hub-Signature-256`.
    #[serde(default)]
    pub webhook_secret: Option<SecretReference>,
}

fn default_source_token() -> SecretReference {
    SecretReference::Env("GITHUB_TOKEN".to_string())
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            source_token: default_source_token(),
            webhook_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Namespacing string shown next to the status.
    #[serde(default = "default_context")]
    pub context: String,
    /// Base joined with relative callback sinks (`owner/repo/statuses/sha`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Publish a `pending` status as soon as an execution starts.
    #[serde(default = "default_report_pending")]
    pub report_pending: bool,
}

fn default_context() -> String {
    "hookflow".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com/repos".to_string()
}

fn default_user_agent() -> String {
    concat!("hookflow/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_report_pending() -> bool {
    true
}

impl StatusConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            api_base_url: default_api_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            report_pending: default_report_pending(),
        }
    }
}
