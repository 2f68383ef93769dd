use super::batch::cmd_batch;
use super::config::cmd_config;
use super::env::CliArgs;
use super::popups::cmd_popups;
use super::rehearse::cmd_rehearse;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Rehearse(args) => cmd_rehearse(args, ctx).await,
        Commands::Batch(args) => cmd_batch(args, ctx).await,
        Commands::Popups(args) => cmd_popups(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
