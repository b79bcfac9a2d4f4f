//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Mr. Clean - Delete stale files and directories by retention rules.
#[derive(Debug, Parser)]
#[command(name = "mrclean")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MRCLEAN_CONFIG", default_value = "mrclean.toml")]
    pub config: PathBuf,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Per-rule time budget in seconds (overrides the config file)
    #[arg(short, long, value_name = "SECS")]
    pub budget: Option<u64>,

    /// Validate the configuration, print the rules and exit
    #[arg(long)]
    pub check: bool,

    /// Repeat the sweep every MINUTES until interrupted
    #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub every: Option<u64>,

    /// Stop after N sweeps (with --every)
    #[arg(long, value_name = "N", requires = "every")]
    pub cycles: Option<usize>,
}
