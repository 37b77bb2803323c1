//! GitHub commit status sink.
//!
//! Posts `{state, target_url, description, context}` to the callback sink.
//! A relative sink (`owner/repo/statuses/sha`) is joined onto the configured
//! API base. An absolute sink URL is used as-is when it shares the API base's
//! origin, and refused otherwise so the credential never leaves that host.

use std::time::Duration;

use hookflow_core::port::status::StatusSink;
use hookflow_types::error::DeliveryError;
use hookflow_types::event::is_url_source;
use hookflow_types::status::StatusUpdate;
use secrecy::{ExposeSecret, SecretString};

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const MAX_ERROR_BODY: usize = 512;

pub struct GitHubStatusSink {
    client: reqwest::Client,
    api_base_url: String,
}

impl GitHubStatusSink {
    pub fn new(
        api_base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.into(),
        })
    }

    fn status_url(&self, callback_sink: &str) -> Result<String, DeliveryError> {
        let sink = callback_sink.trim();
        if is_url_source(sink) {
            if !self.same_origin(sink) {
                tracing::warn!(sink, "refusing callback sink outside the status API");
                return Err(DeliveryError::UntrustedSink(sink.to_string()));
            }
            return Ok(sink.to_string());
        }
        let path = sink.trim_matches('/');
        if path.is_empty() || path.contains("..") {
            return Err(DeliveryError::InvalidSink(callback_sink.to_string()));
        }
        Ok(format!("{}/{path}", self.api_base_url.trim_end_matches('/')))
    }

    fn same_origin(&self, sink: &str) -> bool {
        match (reqwest::Url::parse(sink), reqwest::Url::parse(&self.api_base_url)) {
            (Ok(sink), Ok(base)) => sink.origin() == base.origin(),
            _ => false,
        }
    }
}

impl StatusSink for GitHubStatusSink {
    async fn set_status(
        &self,
        callback_sink: &str,
        update: &StatusUpdate,
        credential: &SecretString,
    ) -> Result<(), DeliveryError> {
        let url = self.status_url(callback_sink)?;

        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", credential.expose_secret()),
            )
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .json(update)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "status accepted by sink");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        })
    }
}
