use std::path::PathBuf;

use clap::Parser;

use super::commands::Commands;
use super::output::{LogFormat, OutputFormat};

/// Drive login and OTP flows on Android devices
#[derive(Parser)]
#[command(name = "devflow", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Engine configuration: selectors, popup catalog, timings
    #[arg(short, long, value_name = "FILE", env = "DEVFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum log level; RUST_LOG takes precedence
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        default_value = "info",
        env = "DEVFLOW_LOG"
    )]
    pub log_level: String,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub debug: bool,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Format of command results on stdout
    #[arg(short, long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
