//! Deriving the concrete fetch location and checking what was fetched.

use hookflow_types::event::is_url_source;
use hookflow_types::task::{ErrorKind, TaskError};

/// Turn an event's source location into a credential-free clone URL.
///
/// `owner/repo` slugs are joined onto `git_base_url`; `http(s)` URLs are
/// used as given once they name a host and a path.
pub fn clone_url(source: &str, git_base_url: &str) -> Result<String, TaskError> {
    let unresolvable = || {
        TaskError::new(
            ErrorKind::UnresolvableSource,
            format!("cannot derive a clone location from '{source}'"),
        )
    };

    if is_url_source(source) {
        let without_scheme = source.split_once("://").map(|(_, rest)| rest).unwrap_or("");
        let (host, path) = without_scheme.split_once('/').ok_or_else(unresolvable)?;
        if host.is_empty() || host.contains('@') || path.trim_matches('/').is_empty() {
            return Err(unresolvable());
        }
        return Ok(source.to_string());
    }

    let segments: Vec<&str> = source.split('/').collect();
    let [owner, repo] = segments.as_slice() else {
        return Err(unresolvable());
    };
    if !is_slug_segment(owner) || !is_slug_segment(repo) {
        return Err(unresolvable());
    }

    let base = git_base_url.trim_end_matches('/');
    if repo.ends_with(".git") {
        Ok(format!("{base}/{owner}/{repo}"))
    } else {
        Ok(format!("{base}/{owner}/{repo}.git"))
    }
}

fn is_slug_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_'))
}

/// Check that the checkout landed on the requested revision.
///
/// A requested revision may be abbreviated, so the checked-out id only has
/// to start with it (case-insensitive).
pub fn verify_revision(requested: &str, checked_out: &str) -> Result<(), TaskError> {
    let requested = requested.trim().to_ascii_lowercase();
    let checked_out = checked_out.trim().to_ascii_lowercase();

    if !requested.is_empty() && checked_out.starts_with(&requested) {
        return Ok(());
    }
    Err(TaskError::new(
        ErrorKind::VerificationMismatch,
        format!("requested revision {requested}, checked out {checked_out}"),
    ))
}
