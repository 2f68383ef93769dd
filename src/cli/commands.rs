use clap::Subcommand;

use super::batch::BatchArgs;
use super::config::ConfigArgs;
use super::popups::PopupsArgs;
use super::rehearse::RehearseArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Drive the login and OTP flows against one scripted device
    Rehearse(RehearseArgs),

    /// Rehearse every scenario in a directory, one device per file
    Batch(BatchArgs),

    /// Inspect the popup catalog
    Popups(PopupsArgs),

    /// Manage devflow configuration
    Config(ConfigArgs),
}
