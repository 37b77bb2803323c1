//! hookflow CLI and HTTP bridge entry point.
//!
//! Binary name: `hookflow`
//!
//! Parses CLI arguments, loads the configuration, then either inspects it or
//! wires the services and serves the bridge routes.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use hookflow_api::cli::{self, Cli, Commands, ConfigCommand};
use hookflow_api::http::router::build_router;
use hookflow_api::state::AppState;
use hookflow_infra::config::{default_config_path, load_config};
use hookflow_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need logging or configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "hookflow", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(&TracingOptions {
        default_filter: cli::log_filter(cli.verbose, cli.quiet).to_string(),
        json: cli.json,
        enable_otel: matches!(cli.command, Commands::Serve { otel: true, .. }),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config_path = match cli.config.clone().or_else(default_config_path) {
        Some(path) => path,
        None => anyhow::bail!("no configuration directory on this platform; pass --config"),
    };

    let result = match cli.command {
        Commands::Serve { port, host, .. } => serve(config_path, host, port, cli.quiet).await,
        Commands::Config { command } => match command {
            ConfigCommand::Check => cli::config::check(&config_path, cli.json).await,
            ConfigCommand::Show => cli::config::show(&config_path, cli.json).await,
        },
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

async fn serve(
    config_path: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    quiet: bool,
) -> anyhow::Result<()> {
    let mut config = load_config(&config_path)
        .await
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::init(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    if !quiet {
        println!(
            "  {} hookflow listening on {}",
            console::style("⚡").bold(),
            console::style(format!("http://{addr}")).cyan()
        );
        println!("  {}", console::style("Press Ctrl+C to stop").dim());
    }
    tracing::info!(%addr, config = %config_path.display(), "bridge started");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("bridge stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
