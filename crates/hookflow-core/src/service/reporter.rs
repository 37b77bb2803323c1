//! Status reporter: publish the terminal outcome to the status sink.

use std::sync::Arc;

use hookflow_types::error::{DeliveryError, SecretError};
use hookflow_types::event::Event;
use hookflow_types::execution::{ExecutionHandle, TerminalNotification};
use hookflow_types::secret::SecretReference;
use hookflow_types::status::StatusUpdate;
use thiserror::Error;

use crate::port::status::DynStatusSink;
use crate::service::secret::SecretStore;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("notification carries no execution reference")]
    MissingExecution,

    #[error("status credential unavailable: {0}")]
    CredentialUnavailable(SecretError),

    #[error("status delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),
}

/// Immutable reporter settings taken from configuration.
#[derive(Debug, Clone)]
pub struct ReporterSettings {
    /// Credential for the status sink (the same one the worker clones with).
    pub credential: SecretReference,
    /// Fixed namespacing string shown with every status.
    pub context: String,
    /// Link template with `{execution_ref}` / `{execution_id}` placeholders.
    pub target_url_template: String,
}

pub struct ReporterService {
    secrets: Arc<SecretStore>,
    sink: DynStatusSink,
    settings: ReporterSettings,
}

impl ReporterService {
    pub fn new(secrets: Arc<SecretStore>, sink: DynStatusSink, settings: ReporterSettings) -> Self {
        Self {
            secrets,
            sink,
            settings,
        }
    }

    /// Publish the terminal status for a finished execution.
    ///
    /// Makes a single set-status call. Failures are returned to the caller
    /// and never re-trigger the workflow.
    pub async fn report(
        &self,
        notification: TerminalNotification,
    ) -> Result<StatusUpdate, ReportError> {
        let execution = notification.execution.ok_or_else(|| {
            tracing::warn!(
                callback_sink = notification.event.callback_sink(),
                "terminal notification without execution reference"
            );
            ReportError::MissingExecution
        })?;

        let update = StatusUpdate::for_result(
            &notification.result,
            self.target_url(&execution),
            self.settings.context.as_str(),
        );
        self.publish(&notification.event, &execution, &update).await?;
        Ok(update)
    }

    /// Publish a `pending` status for an execution that just started.
    pub async fn report_pending(
        &self,
        event: &Event,
        execution: &ExecutionHandle,
    ) -> Result<StatusUpdate, ReportError> {
        let update = StatusUpdate::pending(self.target_url(execution), self.settings.context.as_str());
        self.publish(event, execution, &update).await?;
        Ok(update)
    }

    /// Render the execution link.
    pub fn target_url(&self, execution: &ExecutionHandle) -> String {
        self.settings
            .target_url_template
            .replace("{execution_ref}", &execution.execution_ref)
            .replace("{execution_id}", &execution.execution_id)
    }

    async fn publish(
        &self,
        event: &Event,
        execution: &ExecutionHandle,
        update: &StatusUpdate,
    ) -> Result<(), ReportError> {
        let credential = self
            .secrets
            .resolve(&self.settings.credential)
            .await
            .map_err(ReportError::CredentialUnavailable)?;

        match self
            .sink
            .set_status_boxed(event.callback_sink(), update, &credential)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    execution_id = %execution.execution_id,
                    state = %update.state(),
                    callback_sink = event.callback_sink(),
                    "status published"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    execution_id = %execution.execution_id,
                    state = %update.state(),
                    error = %e,
                    "status delivery failed"
                );
                Err(e.into())
            }
        }
    }
}
