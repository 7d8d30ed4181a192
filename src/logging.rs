// src/logging.rs

//! Logging setup for `slotrunner` using `tracing` + `tracing-subscriber`.
//!
//! Filter resolution:
//! 1. `--log-level` CLI flag applies that level to everything.
//! 2. Otherwise `SLOTRUNNER_LOG` is read as an `EnvFilter` directive string,
//!    so both `debug` and `slotrunner::exec=trace,info` work.
//! 3. Otherwise `info`.
//!
//! Logs go to STDERR; stdout carries only script output.

use anyhow::{Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "SLOTRUNNER_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))
}

/// Resolve the effective filter from the CLI level and the env directives.
///
/// Invalid env directives fall back to `info` rather than failing startup.
pub fn build_filter(cli_level: Option<LogLevel>, env_directives: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::default().add_directive(level_filter(level).into());
    }

    match env_directives.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("ignoring invalid {LOG_ENV}={directives:?}: {e}");
            EnvFilter::new("info")
        }),
        None => EnvFilter::new("info"),
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}
