pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "doc-import")]
#[command(about = "Imports descriptor/payload pairs from an intake directory into their workflow")]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "doc-import.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Scan the intake directory once, then exit
    #[arg(long)]
    pub once: bool,

    /// Import a single descriptor file, then exit
    #[arg(long, conflicts_with = "once")]
    pub file: Option<PathBuf>,
}
