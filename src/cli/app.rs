use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config, LoadedConfig};

/// Parse arguments, set up logging and configuration, then run the command.
pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();
    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    debug!(version = env!("CARGO_PKG_VERSION"), "devflow starting");

    let LoadedConfig { config, path } = load_config(cli.config.as_ref()).await?;
    let ctx = CliContext::new(config, path, cli.output);

    let result = dispatch(&cli, &ctx).await;
    if let Err(err) = &result {
        error!(error = %err, "Command failed");
    }
    result
}
