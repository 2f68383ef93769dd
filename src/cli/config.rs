use std::path::Path;

use action_flow::EngineConfig;
use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::print_structured;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print one value by dotted key, e.g. `timings.home_timeout_ms`
    Get {
        key: String,
    },

    /// Validate the configuration file
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            if !print_structured(ctx.output(), ctx.config())? {
                println!("Current configuration ({}):", path.display());
                println!("{}", serde_yaml::to_string(ctx.config())?);
            }
        }
        ConfigAction::Get { key } => {
            let value = lookup(ctx.config(), &key)?;
            if !print_structured(ctx.output(), &value)? {
                match value.as_str() {
                    Some(text) => println!("{text}"),
                    None => print!("{}", serde_yaml::to_string(&value)?),
                }
            }
        }
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                let config = load_config_file(path).await?;
                config
                    .validate()
                    .with_context(|| format!("validating {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}

async fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let config =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}

/// Resolve a dotted key; list entries are addressed by index (`otp.verify_texts.1`).
fn lookup(config: &EngineConfig, key: &str) -> Result<serde_json::Value> {
    let json = serde_json::to_value(config)?;
    let pointer = format!("/{}", key.replace('.', "/"));
    json.pointer(&pointer)
        .cloned()
        .ok_or_else(|| anyhow!("{key} not found in configuration"))
}
