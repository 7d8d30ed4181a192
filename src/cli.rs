// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `slotrunner`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "slotrunner",
    version,
    about = "Run scripts in a fixed pool of supervised process slots.",
    long_about = None
)]
pub struct CliArgs {
    /// Scripts to run. If empty, every executable found in the discovery
    /// directory is run.
    #[arg(value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Slotrunner.toml` in the current working directory; built-in
    /// defaults are used if that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory to discover scripts in (overrides `[discovery].dir`).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Number of concurrent slots (overrides `[supervisor].slots`).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub slots: Option<u16>,

    /// List discovered scripts and exit.
    #[arg(long)]
    pub list: bool,

    /// Print the command each script would run, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SLOTRUNNER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
