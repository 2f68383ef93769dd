use std::path::PathBuf;

use action_flow::EngineConfig;
use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::LogFormat;

/// Install the global subscriber. Logs go to stderr so structured command
/// output on stdout stays parseable.
pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: EngineConfig,
    pub path: PathBuf,
}

/// Default location when `--config` is not given.
pub fn default_config_path() -> Result<PathBuf> {
    // Priority: ./config/devflow.yaml > ~/.config/devflow/config.yaml
    let local_config = PathBuf::from("config/devflow.yaml");
    if local_config.exists() {
        return Ok(local_config);
    }

    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("devflow");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    if fs::try_exists(&config_path).await.unwrap_or(false) {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config: EngineConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!(path = %config_path.display(), "Loaded engine configuration");
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(path = %config_path.display(), "No configuration file; using defaults");
        Ok(LoadedConfig {
            config: EngineConfig::default(),
            path: config_path,
        })
    }
}
