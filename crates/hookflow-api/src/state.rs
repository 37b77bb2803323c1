//! Application state wiring all services together.
//!
//! [`AppState::init`] pins the core services to the infra adapters chosen by
//! configuration. [`AppState::with_ports`] takes the adapters directly so
//! tests can substitute doubles at every port.

use std::sync::Arc;

use anyhow::Context;
use hookflow_core::port::engine::DynWorkflowEngine;
use hookflow_core::port::invoker::DynAsyncInvoker;
use hookflow_core::port::secret::DynSecretProvider;
use hookflow_core::port::status::DynStatusSink;
use hookflow_core::port::task::DynTaskRunner;
use hookflow_core::service::dispatcher::DispatcherService;
use hookflow_core::service::intake::IntakeService;
use hookflow_core::service::reporter::{ReporterService, ReporterSettings};
use hookflow_core::service::secret::SecretStore;
use hookflow_core::service::worker::{WorkerService, WorkerSettings};
use hookflow_infra::engine::{HttpWorkflowEngine, LocalEngine, LocalEngineDriver};
use hookflow_infra::invoker::{HttpInvoker, LocalInvoker};
use hookflow_infra::keychain::KeychainProvider;
use hookflow_infra::secret::chain::build_secret_chain;
use hookflow_infra::status::GitHubStatusSink;
use hookflow_infra::task::GitTaskRunner;
use hookflow_types::config::{BridgeConfig, EngineMode, InvokerMode};
use secrecy::SecretString;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub intake: Arc<IntakeService>,
    pub dispatcher: Arc<DispatcherService>,
    pub worker: Arc<WorkerService>,
    pub reporter: Arc<ReporterService>,
    /// Shared secret for `X-Hub-Signature-256`; `None` disables the check.
    pub webhook_secret: Option<Arc<SecretString>>,
    /// Publish `pending` from `/webhook` before answering. Only set for a
    /// remote engine; the local engine publishes it before dispatching.
    pub pending_at_intake: bool,
}

/// Engine side of the wiring.
pub enum EnginePort {
    /// In-process engine; its driver is spawned once the reporter exists.
    Local(LocalEngine, LocalEngineDriver),
    Remote(DynWorkflowEngine),
}

/// The adapters behind each port.
pub struct Ports {
    pub secrets: Vec<DynSecretProvider>,
    pub sink: DynStatusSink,
    pub runner: DynTaskRunner,
    pub engine: EnginePort,
    /// `None` runs the worker in-process.
    pub invoker: Option<DynAsyncInvoker>,
}

impl AppState {
    /// Build the adapters named by `config` and wire the services.
    ///
    /// Spawns the local engine driver when `engine.mode = "local"`, so it must
    /// run inside a tokio runtime.
    pub async fn init(config: BridgeConfig) -> anyhow::Result<Self> {
        let sink = GitHubStatusSink::new(
            config.status.api_base_url.as_str(),
            &config.status.user_agent,
            config.status.request_timeout(),
        )
        .context("failed to build status sink")?;

        let runner = GitTaskRunner::new(
            config.worker.git_program.as_str(),
            config.worker.workdir.clone(),
            config.build.clone(),
        )
        .with_credential_base_url(&config.worker.git_base_url);

        let engine = match config.engine.mode {
            EngineMode::Local => {
                let (engine, driver) = LocalEngine::new(
                    config.engine.state_machine.as_str(),
                    config.engine.step_timeout(),
                );
                EnginePort::Local(engine, driver)
            }
            EngineMode::Http => EnginePort::Remote(Arc::new(
                HttpWorkflowEngine::new(
                    config.engine.base_url.as_str(),
                    config.engine.request_timeout(),
                )
                .context("failed to build engine client")?,
            )),
        };

        let invoker: Option<DynAsyncInvoker> = match config.worker.mode {
            InvokerMode::Local => None,
            InvokerMode::Http => Some(Arc::new(
                HttpInvoker::new(
                    config.worker.invoke_url.as_str(),
                    config.worker.invoke_timeout(),
                )
                .context("failed to build worker invoker")?,
            )),
        };

        tracing::info!(
            engine = ?config.engine.mode,
            worker = ?config.worker.mode,
            "wiring services"
        );

        Self::with_ports(
            config,
            Ports {
                secrets: build_secret_chain(Some(KeychainProvider::new())),
                sink: Arc::new(sink),
                runner: Arc::new(runner),
                engine,
                invoker,
            },
        )
        .await
    }

    /// Wire the services over the given adapters.
    pub async fn with_ports(config: BridgeConfig, ports: Ports) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let secrets = Arc::new(SecretStore::new(ports.secrets));

        let webhook_secret = match &config.secrets.webhook_secret {
            Some(reference) => Some(Arc::new(
                secrets
                    .resolve(reference)
                    .await
                    .with_context(|| format!("failed to resolve webhook secret {reference}"))?,
            )),
            None => None,
        };

        let reporter = Arc::new(ReporterService::new(
            Arc::clone(&secrets),
            ports.sink,
            ReporterSettings {
                credential: config.secrets.source_token.clone(),
                context: config.status.context.clone(),
                target_url_template: config.engine.console_url_template.clone(),
            },
        ));

        let report_pending = config.status.report_pending;
        let (engine, driver): (DynWorkflowEngine, Option<LocalEngineDriver>) = match ports.engine {
            EnginePort::Local(engine, driver) => {
                let driver = driver.with_pending_status(report_pending);
                (Arc::new(engine) as DynWorkflowEngine, Some(driver))
            }
            EnginePort::Remote(engine) => (engine, None),
        };

        let worker = Arc::new(WorkerService::new(
            Arc::clone(&engine),
            Arc::clone(&secrets),
            ports.runner,
            WorkerSettings {
                credential: config.secrets.source_token.clone(),
                task_timeout: config.worker.task_timeout(),
                git_base_url: config.worker.git_base_url.clone(),
            },
        ));

        let invoker = match ports.invoker {
            Some(invoker) => invoker,
            None => Arc::new(LocalInvoker::new(Arc::clone(&worker))) as DynAsyncInvoker,
        };
        let dispatcher = Arc::new(DispatcherService::new(invoker));

        let pending_at_intake = report_pending && driver.is_none();
        if let Some(driver) = driver {
            tokio::spawn(driver.run(Arc::clone(&dispatcher), Arc::clone(&reporter)));
        }

        Ok(Self {
            intake: Arc::new(IntakeService::new(engine)),
            dispatcher,
            worker,
            reporter,
            webhook_secret,
            pending_at_intake,
            config,
        })
    }
}
