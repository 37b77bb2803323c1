//! `hookflow config` subcommands.

use std::path::Path;

use hookflow_infra::config::load_config;
use hookflow_types::config::BridgeConfig;

/// Load and validate the configuration, printing a short summary.
pub async fn check(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(path).await?;

    if json {
        let summary = serde_json::json!({
            "path": path.display().to_string(),
            "valid": true,
            "engine": config.engine.mode,
            "worker": config.worker.mode,
            "listen": format!("{}:{}", config.server.host, config.server.port),
            "signatureRequired": config.secrets.webhook_secret.is_some(),
            "buildEnabled": !config.build.command.is_empty(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        console::style("✓").green(),
        console::style(path.display()).cyan()
    );
    print_summary(&config);
    println!();
    Ok(())
}

/// Print the effective configuration as TOML (or JSON).
pub async fn show(path: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

fn print_summary(config: &BridgeConfig) {
    let row = |label: &str, value: String| {
        println!("    {:<12} {}", console::style(label).dim(), value);
    };
    row("listen", format!("{}:{}", config.server.host, config.server.port));
    row("engine", format!("{:?}", config.engine.mode).to_lowercase());
    row("worker", format!("{:?}", config.worker.mode).to_lowercase());
    row("credential", config.secrets.source_token.to_string());
    row(
        "signature",
        match &config.secrets.webhook_secret {
            Some(reference) => reference.to_string(),
            None => "disabled".to_string(),
        },
    );
    row(
        "build",
        if config.build.command.is_empty() {
            "disabled".to_string()
        } else {
            config.build.command.join(" ")
        },
    );
}
