//! Configuration loader for hookflow.
//!
//! Reads `config.toml` and deserializes it into [`BridgeConfig`]. A missing
//! file yields defaults; a file that exists but cannot be read, parsed or
//! validated is an error.

use std::path::{Path, PathBuf};

use hookflow_types::config::BridgeConfig;
use hookflow_types::error::ConfigError;

/// `~/.config/hookflow/config.toml` (platform config dir).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hookflow").join("config.toml"))
}

/// Load and validate configuration from `path`.
pub async fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            let config = BridgeConfig::default();
            config.validate()?;
            return Ok(config);
        }
        Err(err) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    let config = parse_config(&content)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse and validate a TOML config string.
pub fn parse_config(content: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookflow_types::config::EngineMode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).await.unwrap();
        assert_eq!(config.server.port, 8780);
        assert_eq!(config.engine.mode, EngineMode::Local);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9100

[build]
command = ["./build-country-polygon.py"]
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.build.command, vec!["./build-country-polygon.py"]);
    }

    #[tokio::test]
    async fn load_config_malformed_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "this is [not valid toml {{{")
            .await
            .unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn load_config_invalid_values_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "[status]\ncontext = \"\"\n")
            .await
            .unwrap();

        let err = load_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "status.context", .. }));
    }

    #[test]
    fn default_config_path_ends_with_hookflow_config() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("hookflow/config.toml"));
        }
    }
}
