use anyhow::Result;
use clap::{Args, Subcommand};
use popup_guard::PopupKind;

use crate::cli::context::CliContext;
use crate::cli::output::print_structured;

#[derive(Args, Clone, Debug)]
pub struct PopupsArgs {
    #[command(subcommand)]
    pub action: PopupsAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum PopupsAction {
    /// List the popup catalog in the order it is scanned
    List,
}

pub async fn cmd_popups(args: PopupsArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        PopupsAction::List => {
            let catalog = ctx.config().popup_catalog()?;
            if print_structured(ctx.output(), &catalog.definitions())? {
                return Ok(());
            }

            println!("{} popup(s), lowest priority first:", catalog.len());
            for popup in catalog.iter() {
                let kind = match &popup.kind {
                    PopupKind::Generic => "generic",
                    PopupKind::Tutorial { .. } => "tutorial",
                };
                println!(
                    "  [{}] {} ({})  container={}  dismiss={}",
                    popup.priority, popup.name, kind, popup.container, popup.dismiss
                );
                for alternate in &popup.alternates {
                    println!("        alternate={}", alternate);
                }
            }
        }
    }

    Ok(())
}
