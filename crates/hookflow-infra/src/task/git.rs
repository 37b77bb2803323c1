//! Git-backed task runner.
//!
//! Clones the source into a temporary directory, fetches and checks out the
//! target revision, lists files changed on the target since its merge-base
//! with the base revision and runs the configured build command over the
//! relevant ones. The clone is shallow when there is no base to compare
//! against. The directory is removed when the run ends, including when the
//! run is aborted.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use hookflow_core::port::task::{TaskRequest, TaskRun, TaskRunner};
use hookflow_types::config::BuildConfig;
use hookflow_types::task::{ErrorKind, TaskError};
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

const CREDENTIAL_USER: &str = "x-access-token";
const MAX_STDERR_LEN: usize = 400;

pub struct GitTaskRunner {
    git_program: String,
    workdir: Option<PathBuf>,
    build: BuildConfig,
    credential_host: Option<String>,
}

impl GitTaskRunner {
    pub fn new(git_program: impl Into<String>, workdir: Option<PathBuf>, build: BuildConfig) -> Self {
        Self {
            git_program: git_program.into(),
            workdir,
            build,
            credential_host: None,
        }
    }

    /// Only clone URLs on the host of `base_url` receive the credential.
    /// Without one the credential is never put into a URL.
    pub fn with_credential_base_url(mut self, base_url: &str) -> Self {
        self.credential_host = reqwest::Url::parse(base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        self
    }

    fn scratch_dir(&self, label: &str) -> Result<tempfile::TempDir, TaskError> {
        let mut builder = tempfile::Builder::new();
        let prefix = format!("hookflow-{label}-");
        builder.prefix(&prefix);
        let dir = match &self.workdir {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(|e| failed(format!("failed to create work directory: {e}")))
    }

    async fn git(&self, cwd: &Path, args: &[&str], secret: &str) -> Result<String, TaskError> {
        let subcommand = args.first().copied().unwrap_or_default();
        let mut command = Command::new(&self.git_program);
        command
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0");
        run(command, &format!("git {subcommand}"), secret).await
    }

    async fn build(
        &self,
        repo: &Path,
        files: &[String],
        ignore_locals: bool,
        secret: &str,
    ) -> Result<(), TaskError> {
        let Some((program, leading)) = self.build.command.split_first() else {
            return Ok(());
        };
        let mut command = Command::new(program);
        command
            .args(leading)
            .args(files)
            .args(&self.build.extra_args)
            .current_dir(repo);
        if ignore_locals {
            command.args(&self.build.ignore_locals_args);
        }
        run(command, "build", secret).await.map(|_| ())
    }
}

impl TaskRunner for GitTaskRunner {
    async fn run(
        &self,
        request: TaskRequest,
        credential: SecretString,
    ) -> Result<TaskRun, TaskError> {
        let secret = credential.expose_secret();
        let remote = authenticated_url(&request.clone_url, secret, self.credential_host.as_deref())?;
        let scratch = self.scratch_dir(&request.label)?;
        let repo = scratch.path().join("repo");
        let repo_arg = repo.to_string_lossy().into_owned();

        // The merge-base diff needs history; without a base one commit is enough.
        let depth: &[&str] = match request.base_revision {
            Some(_) => &[],
            None => &["--depth", "1"],
        };

        tracing::debug!(label = %request.label, dir = %scratch.path().display(), "cloning");
        let mut clone = vec!["clone", "--quiet"];
        clone.extend_from_slice(depth);
        clone.extend([remote.as_str(), repo_arg.as_str()]);
        self.git(scratch.path(), &clone, secret).await?;
        let mut fetch = vec!["fetch", "--quiet"];
        fetch.extend_from_slice(depth);
        fetch.extend(["origin", request.target_revision.as_str()]);
        self.git(&repo, &fetch, secret).await?;
        self.git(&repo, &["checkout", "--quiet", "--detach", "FETCH_HEAD"], secret)
            .await?;
        let checked_out_revision = self.git(&repo, &["rev-parse", "HEAD"], secret).await?;

        let changed_files = match &request.base_revision {
            Some(base) => {
                self.git(&repo, &["fetch", "--quiet", "origin", base], secret)
                    .await?;
                let listing = self
                    .git(&repo, &["diff", "--name-only", "FETCH_HEAD...HEAD"], secret)
                    .await?;
                select_changed(listing.lines(), &self.build.changed_prefix, &self.build.changed_suffix)
            }
            None => Vec::new(),
        };

        let built = !self.build.command.is_empty() && !changed_files.is_empty();
        if built {
            tracing::info!(label = %request.label, files = changed_files.len(), "running build");
            self.build(&repo, &changed_files, request.ignore_locals, secret)
                .await?;
        } else {
            tracing::debug!(label = %request.label, "nothing to build");
        }

        Ok(TaskRun {
            checked_out_revision,
            changed_files,
            built,
        })
    }
}

/// Run to completion, killing the child if the future is dropped.
async fn run(mut command: Command, what: &str, secret: &str) -> Result<String, TaskError> {
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| failed(format!("failed to start {what}: {e}")))?;

    if !output.status.success() {
        let stderr = redact(&String::from_utf8_lossy(&output.stderr), secret);
        let stderr = stderr.trim();
        let tail: String = stderr
            .chars()
            .skip(stderr.chars().count().saturating_sub(MAX_STDERR_LEN))
            .collect();
        return Err(failed(format!("{what} failed ({}): {tail}", output.status)));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn failed(cause: String) -> TaskError {
    TaskError::new(ErrorKind::TaskExecutionFailed, cause)
}

/// Put the credential into the user-info of an http(s) clone URL on
/// `trusted_host`.
///
/// Other schemes and other hosts are returned without credentials.
pub fn authenticated_url(
    clone_url: &str,
    secret: &str,
    trusted_host: Option<&str>,
) -> Result<String, TaskError> {
    let mut url = reqwest::Url::parse(clone_url).map_err(|e| {
        TaskError::new(ErrorKind::UnresolvableSource, format!("invalid clone URL: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || secret.is_empty() {
        return Ok(url.into());
    }
    let trusted = match (url.host_str(), trusted_host) {
        (Some(host), Some(trusted)) => host.eq_ignore_ascii_case(trusted),
        _ => false,
    };
    if !trusted {
        tracing::warn!(
            host = url.host_str().unwrap_or_default(),
            "clone host is not the configured git host, cloning without credentials"
        );
        let _ = url.set_username("");
        let _ = url.set_password(None);
        return Ok(url.into());
    }
    if url.set_username(CREDENTIAL_USER).is_err() || url.set_password(Some(secret)).is_err() {
        return Err(TaskError::new(
            ErrorKind::UnresolvableSource,
            "clone URL cannot carry credentials",
        ));
    }
    Ok(url.into())
}

/// Keep paths that start with `prefix` and end with `suffix`.
pub fn select_changed<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    prefix: &str,
    suffix: &str,
) -> Vec<String> {
    paths
        .into_iter()
        .map(str::trim)
        .filter(|path| !path.is_empty() && path.starts_with(prefix) && path.ends_with(suffix))
        .map(str::to_string)
        .collect()
}

fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        return text.to_string();
    }
    text.replace(secret, "***")
}
