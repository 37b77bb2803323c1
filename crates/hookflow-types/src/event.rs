//! Inbound event model.
//!
//! `Event` is the normalized form of a source-control notification. It is
//! built once, either from the normalized JSON shape (`{"eventKind": ...}`)
//! or from a native GitHub `pull_request` / `push` payload, and every later
//! hop consumes the typed value. Deserializing an `Event` always runs the
//! same validation as [`Event::from_delivery`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Number of leading revision characters used in execution subjects.
pub const SHORT_REVISION_LEN: usize = 12;

/// The closed set of triggering occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Push,
    Opened,
    Synchronize,
    Reopened,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::Opened => "opened",
            EventKind::Synchronize => "synchronize",
            EventKind::Reopened => "reopened",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(EventKind::Push),
            "opened" => Ok(EventKind::Opened),
            "synchronize" => Ok(EventKind::Synchronize),
            "reopened" => Ok(EventKind::Reopened),
            other => Err(EventError::UnsupportedKind(other.to_string())),
        }
    }
}

/// A validated triggering event.
///
/// Fields are private so a constructed `Event` cannot drift from the
/// validated shape; use the accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "EventFields")]
pub struct Event {
    event_kind: EventKind,
    target_revision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_revision: Option<String>,
    source_location: String,
    callback_sink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    change_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery_id: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    ignore_locals: bool,
}

fn is_false(value: &bool) -> bool {
    !value
}

impl Event {
    /// Parse an inbound delivery.
    ///
    /// `kind` is the transport's event-kind header (`X-GitHub-Event`) and
    /// `delivery_id` its delivery identifier (`X-GitHub-Delivery`). A body
    /// carrying `eventKind` is read as the normalized shape regardless of the
    /// header; anything else is read as a GitHub payload.
    pub fn from_delivery(
        kind: Option<&str>,
        delivery_id: Option<&str>,
        body: &[u8],
    ) -> Result<Self, EventError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| EventError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(EventError::InvalidJson("expected a JSON object".to_string()));
        }

        let mut fields = if value.get("eventKind").is_some() {
            serde_json::from_value::<EventFields>(value)
                .map_err(|e| EventError::InvalidJson(e.to_string()))?
        } else {
            serde_json::from_value::<GitHubPayload>(value)
                .map_err(|e| EventError::InvalidJson(e.to_string()))?
                .into_fields(kind)?
        };

        if let Some(id) = non_blank(delivery_id.map(str::to_string)) {
            fields.delivery_id = Some(id);
        }

        Event::try_from(fields)
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    pub fn target_revision(&self) -> &str {
        &self.target_revision
    }

    pub fn base_revision(&self) -> Option<&str> {
        self.base_revision.as_deref()
    }

    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn callback_sink(&self) -> &str {
        &self.callback_sink
    }

    pub fn change_number(&self) -> Option<u64> {
        self.change_number
    }

    pub fn delivery_id(&self) -> Option<&str> {
        self.delivery_id.as_deref()
    }

    /// Whether the build should skip locally cached inputs for this run.
    pub fn ignore_locals(&self) -> bool {
        self.ignore_locals
    }

    /// Key shared by every event about the same change request
    /// (`{source}#{number}`). A newer execution for the same key supersedes
    /// the running ones. `None` for events outside a change request.
    pub fn change_subject(&self) -> Option<String> {
        let number = self.change_number?;
        let source = self.source_location.trim_end_matches('/');
        let source = source.strip_suffix(".git").unwrap_or(source);
        Some(format!("{source}#{number}"))
    }

    /// Last path segment of the source location without a `.git` suffix.
    pub fn repository_name(&self) -> &str {
        let trimmed = self.source_location.trim_end_matches('/');
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        last.strip_suffix(".git").unwrap_or(last)
    }

    /// Target revision cut to [`SHORT_REVISION_LEN`] characters.
    pub fn short_revision(&self) -> &str {
        let end = self.target_revision.len().min(SHORT_REVISION_LEN);
        &self.target_revision[..end]
    }
}

/// Whether `value` looks like a commit id: 4 to 64 hex characters.
pub fn is_commit_id(value: &str) -> bool {
    (4..=64).contains(&value.len()) && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Whether `source` is an `http(s)` URL rather than an `owner/repo` slug.
pub fn is_url_source(source: &str) -> bool {
    source.starts_with("https://") || source.starts_with("http://")
}

// ---------------------------------------------------------------------------
// Normalized wire shape
// ---------------------------------------------------------------------------

/// Unvalidated normalized fields. Every path into `Event` goes through
/// `TryFrom<EventFields>`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventFields {
    event_kind: Option<String>,
    target_revision: Option<String>,
    base_revision: Option<String>,
    source_location: Option<String>,
    callback_sink: Option<String>,
    change_number: Option<u64>,
    delivery_id: Option<String>,
    ignore_locals: Option<bool>,
}

impl TryFrom<EventFields> for Event {
    type Error = EventError;

    fn try_from(fields: EventFields) -> Result<Self, Self::Error> {
        let kind = non_blank(fields.event_kind).ok_or(EventError::MissingField("eventKind"))?;
        let event_kind: EventKind = kind.parse()?;

        let target_revision = revision("targetRevision", fields.target_revision)?
            .ok_or(EventError::MissingField("targetRevision"))?;
        // An all-zero base is how GitHub reports a newly created ref.
        let base_revision = revision("baseRevision", fields.base_revision)?
            .filter(|rev| !rev.bytes().all(|b| b == b'0'));

        let source_location =
            non_blank(fields.source_location).ok_or(EventError::MissingField("sourceLocation"))?;
        check_source(&source_location)?;

        let callback_sink = match non_blank(fields.callback_sink) {
            Some(sink) => sink,
            None => derive_callback_sink(&source_location, &target_revision)
                .ok_or(EventError::MissingField("callbackSink"))?,
        };

        Ok(Event {
            event_kind,
            target_revision,
            base_revision,
            source_location,
            callback_sink,
            change_number: fields.change_number,
            delivery_id: non_blank(fields.delivery_id),
            ignore_locals: fields.ignore_locals.unwrap_or(false),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn revision(field: &'static str, value: Option<String>) -> Result<Option<String>, EventError> {
    match non_blank(value) {
        None => Ok(None),
        Some(value) if is_commit_id(&value) => Ok(Some(value)),
        Some(value) => Err(EventError::InvalidRevision { field, value }),
    }
}

fn check_source(source: &str) -> Result<(), EventError> {
    let shaped = is_url_source(source) || source.contains('/');
    if !shaped || source.chars().any(char::is_whitespace) {
        return Err(EventError::InvalidSource(source.to_string()));
    }
    Ok(())
}

/// `owner/repo` sources get the conventional `{owner}/{repo}/statuses/{sha}`
/// sink; URL sources must name their sink explicitly.
fn derive_callback_sink(source: &str, revision: &str) -> Option<String> {
    if is_url_source(source) {
        return None;
    }
    let mut parts = source.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some(format!("{owner}/{repo}/statuses/{revision}"))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// GitHub payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GitHubPayload {
    action: Option<String>,
    number: Option<u64>,
    pull_request: Option<GitHubPullRequest>,
    before: Option<String>,
    after: Option<String>,
    repository: Option<GitHubRepository>,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    number: Option<u64>,
    statuses_url: Option<String>,
    head: Option<GitHubRef>,
    base: Option<GitHubRef>,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    sha: Option<String>,
    repo: Option<GitHubRepository>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    full_name: Option<String>,
    clone_url: Option<String>,
    statuses_url: Option<String>,
}

impl GitHubRepository {
    fn location(&self) -> Option<String> {
        non_blank(self.full_name.clone()).or_else(|| non_blank(self.clone_url.clone()))
    }
}

enum GitHubKind {
    PullRequest,
    Push,
}

impl GitHubPayload {
    fn into_fields(self, header: Option<&str>) -> Result<EventFields, EventError> {
        let kind = match header.map(str::trim) {
            Some("pull_request") => GitHubKind::PullRequest,
            Some("push") => GitHubKind::Push,
            Some(other) if !other.is_empty() => {
                return Err(EventError::UnsupportedKind(other.to_string()));
            }
            _ if self.pull_request.is_some() => GitHubKind::PullRequest,
            _ if self.after.is_some() => GitHubKind::Push,
            _ => return Err(EventError::MissingField("eventKind")),
        };

        match kind {
            GitHubKind::PullRequest => self.pull_request_fields(),
            GitHubKind::Push => Ok(self.push_fields()),
        }
    }

    fn pull_request_fields(self) -> Result<EventFields, EventError> {
        let action = non_blank(self.action).ok_or(EventError::MissingField("action"))?;
        match action.parse::<EventKind>() {
            Ok(EventKind::Push) | Err(_) => {
                return Err(EventError::UnsupportedKind(format!("pull_request.{action}")));
            }
            Ok(_) => {}
        }

        let pr = self
            .pull_request
            .ok_or(EventError::MissingField("pull_request"))?;
        let head = pr.head.ok_or(EventError::MissingField("pull_request.head"))?;
        let target_revision = head.sha;

        // The head repository is where the revision lives (forks included).
        let source_location = head
            .repo
            .as_ref()
            .and_then(GitHubRepository::location)
            .or_else(|| self.repository.as_ref().and_then(GitHubRepository::location));

        let statuses_url = pr
            .statuses_url
            .or_else(|| self.repository.and_then(|r| r.statuses_url));

        Ok(EventFields {
            event_kind: Some(action),
            callback_sink: sink_from_statuses_url(statuses_url, target_revision.as_deref()),
            target_revision,
            base_revision: pr.base.and_then(|b| b.sha),
            source_location,
            change_number: self.number.or(pr.number),
            delivery_id: None,
            ignore_locals: None,
        })
    }

    fn push_fields(self) -> EventFields {
        let source_location = self.repository.as_ref().and_then(GitHubRepository::location);
        let statuses_url = self.repository.and_then(|r| r.statuses_url);

        EventFields {
            event_kind: Some(EventKind::Push.as_str().to_string()),
            callback_sink: sink_from_statuses_url(statuses_url, self.after.as_deref()),
            target_revision: self.after,
            base_revision: self.before,
            source_location,
            change_number: None,
            delivery_id: None,
            ignore_locals: None,
        }
    }
}

fn sink_from_statuses_url(url: Option<String>, revision: Option<&str>) -> Option<String> {
    let url = non_blank(url)?;
    Some(match revision {
        Some(rev) => url.replace("{sha}", rev.trim()),
        None => url,
    })
}
