//! Intake: validate an inbound delivery and start its execution.

use hookflow_types::error::{EngineError, EventError};
use hookflow_types::event::Event;
use hookflow_types::execution::{ExecutionHandle, execution_name};
use thiserror::Error;

use crate::port::engine::DynWorkflowEngine;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] EventError),

    #[error("failed to start execution: {0}")]
    StartFailed(EngineError),
}

/// A raw delivery as it arrived, plus the request-scoped id of the call.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Event kind header (`X-GitHub-Event`).
    pub kind: Option<&'a str>,
    /// Delivery id header (`X-GitHub-Delivery`).
    pub delivery_id: Option<&'a str>,
    /// Uniqueness fallback when no delivery id was sent.
    pub request_id: &'a str,
    pub body: &'a [u8],
}

/// A started (or reused) execution.
#[derive(Debug, Clone)]
pub struct Admission {
    pub event: Event,
    pub handle: ExecutionHandle,
}

pub struct IntakeService {
    engine: DynWorkflowEngine,
}

impl IntakeService {
    pub fn new(engine: DynWorkflowEngine) -> Self {
        Self { engine }
    }

    /// Parse the delivery and ask the engine to start its execution.
    ///
    /// Calls `start_execution` at most once and never waits for execution
    /// progress. A malformed delivery never reaches the engine.
    pub async fn accept(&self, delivery: Delivery<'_>) -> Result<Admission, IntakeError> {
        let event = Event::from_delivery(delivery.kind, delivery.delivery_id, delivery.body)
            .inspect_err(|e| {
                tracing::warn!(
                    delivery_id = delivery.delivery_id,
                    error = %e,
                    "rejecting malformed event"
                );
            })?;

        let uniqueness = event.delivery_id().unwrap_or(delivery.request_id);
        let name = execution_name(&event, uniqueness);

        self.supersede(&event, &name).await;

        let handle = self
            .engine
            .start_execution_boxed(&name, &event)
            .await
            .map_err(|e| {
                tracing::error!(execution_id = %name, error = %e, "start execution failed");
                IntakeError::StartFailed(e)
            })?;

        tracing::info!(
            execution_id = %handle.execution_id,
            event_kind = %event.event_kind(),
            target_revision = event.target_revision(),
            source = event.source_location(),
            "execution started"
        );

        Ok(Admission { event, handle })
    }

    /// Stop older executions of the same change request. Failures are
    /// logged and never block the new start.
    async fn supersede(&self, event: &Event, name: &str) {
        let (Some(subject), Some(number)) = (event.change_subject(), event.change_number()) else {
            return;
        };
        let cause = format!("New commit pushed to PR #{number}");
        match self
            .engine
            .stop_superseded_boxed(&subject, name, &cause)
            .await
        {
            Ok(0) => {}
            Ok(stopped) => {
                tracing::info!(subject = %subject, stopped, "superseded running executions");
            }
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "failed to stop superseded executions");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingEngine;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn delivery<'a>(body: &'a [u8], delivery_id: Option<&'a str>) -> Delivery<'a> {
        Delivery {
            kind: None,
            delivery_id,
            request_id: "req-7",
            body,
        }
    }

    fn normalized() -> Vec<u8> {
        json!({
            "eventKind": "synchronize",
            "targetRevision": "abc123",
            "sourceLocation": "org/repo",
            "callbackSink": "org/repo/statuses/abc123"
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_accept_starts_named_execution() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = normalized();

        let admission = intake.accept(delivery(&body, None)).await.unwrap();

        assert_eq!(admission.handle.execution_id, "repo-abc123-req-7");
        assert_eq!(admission.handle.execution_ref, "hookflow/repo-abc123-req-7");
        let starts = engine.starts.lock().unwrap();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].0, "repo-abc123-req-7");
        assert_eq!(starts[0].1.callback_sink(), "org/repo/statuses/abc123");
    }

    #[tokio::test]
    async fn test_delivery_id_names_the_execution() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = normalized();

        let first = intake
            .accept(delivery(&body, Some("d-42")))
            .await
            .unwrap();
        let again = intake
            .accept(delivery(&body, Some("d-42")))
            .await
            .unwrap();

        assert_eq!(first.handle.execution_id, "repo-abc123-d-42");
        assert_eq!(first.handle.execution_id, again.handle.execution_id);
    }

    #[tokio::test]
    async fn test_accept_returns_without_waiting_for_execution() {
        // The recording engine never runs anything; accept must still finish.
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine);
        let body = normalized();

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            intake.accept(delivery(&body, None)),
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_revision_never_reaches_engine() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = json!({"eventKind": "opened", "sourceLocation": "org/repo"}).to_string();

        let err = intake
            .accept(delivery(body.as_bytes(), None))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IntakeError::MalformedEvent(EventError::MissingField("targetRevision"))
        ));
        assert!(engine.starts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_never_reaches_engine() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = json!({"eventKind": "opened", "targetRevision": "abc123"}).to_string();

        let err = intake
            .accept(delivery(body.as_bytes(), None))
            .await
            .unwrap_err();

        assert!(matches!(err, IntakeError::MalformedEvent(_)));
        assert!(engine.starts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_is_start_failed() {
        let engine = Arc::new(RecordingEngine {
            reject_starts: true,
            ..Default::default()
        });
        let intake = IntakeService::new(engine);
        let body = normalized();

        let err = intake.accept(delivery(&body, None)).await.unwrap_err();
        assert!(matches!(err, IntakeError::StartFailed(EngineError::Unavailable(_))));
    }

    // -----------------------------------------------------------------------
    // Supersede
    // -----------------------------------------------------------------------

    fn change_request(revision: &str) -> Vec<u8> {
        json!({
            "eventKind": "synchronize",
            "targetRevision": revision,
            "sourceLocation": "org/repo",
            "callbackSink": format!("org/repo/statuses/{revision}"),
            "changeNumber": 7
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_change_request_stops_older_executions_before_start() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = change_request("def456");

        let admission = intake.accept(delivery(&body, Some("d-2"))).await.unwrap();

        let stops = engine.stops.lock().unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].0, "org/repo#7");
        assert_eq!(stops[0].1, admission.handle.execution_id);
        assert_eq!(stops[0].2, "New commit pushed to PR #7");
        assert_eq!(engine.starts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_events_outside_change_requests_stop_nothing() {
        let engine = Arc::new(RecordingEngine::default());
        let intake = IntakeService::new(engine.clone());
        let body = normalized();

        intake.accept(delivery(&body, None)).await.unwrap();

        assert!(engine.stops.lock().unwrap().is_empty());
        assert_eq!(engine.starts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_stop_still_starts_execution() {
        let engine = Arc::new(RecordingEngine {
            reject_stops: true,
            ..Default::default()
        });
        let intake = IntakeService::new(engine.clone());
        let body = change_request("def456");

        let admission = intake.accept(delivery(&body, None)).await.unwrap();

        assert_eq!(admission.handle.execution_id, "repo-def456-req-7");
        assert_eq!(engine.starts.lock().unwrap().len(), 1);
    }
}
