// src/lib.rs

pub mod cli;
pub mod config;
pub mod discover;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod runner;
pub mod slot;
pub mod supervisor;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::discover::discover_scripts;
use crate::exec::{ScriptKind, build_command};
use crate::fs::RealFileSystem;
use crate::runner::{DEFAULT_TICK, run_scripts};

pub use crate::supervisor::Supervisor;
pub use crate::types::SlotStatus;

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading (+ CLI overrides)
/// - script discovery
/// - the supervisor and the headless runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_config(&args)?;

    let scripts = if args.list || args.scripts.is_empty() {
        discover_scripts(&RealFileSystem, &cfg.discovery.dir, cfg.discovery.recursive)?
    } else {
        args.scripts.clone()
    };

    if args.list {
        for script in &scripts {
            println!("{}", script.display());
        }
        return Ok(0);
    }

    if args.dry_run {
        print_dry_run(&cfg, &scripts);
        return Ok(0);
    }

    if scripts.is_empty() {
        warn!(dir = ?cfg.discovery.dir, "no scripts to run");
        return Ok(0);
    }

    let supervisor = Supervisor::new(cfg.supervisor.clone())?;

    // Ctrl-C → graceful shutdown.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let mut stdout = std::io::stdout();
    let summary = run_scripts(&supervisor, scripts, &mut stdout, DEFAULT_TICK, shutdown).await?;

    if !summary.failed.is_empty() {
        for script in &summary.failed {
            eprintln!("failed: {}", script.display());
        }
    }
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        "all scripts done"
    );

    Ok(summary.exit_code())
}

/// Load the config file and apply command-line overrides.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let (path, optional) = match &args.config {
        Some(path) => (path.clone(), false),
        None => (default_config_path(), true),
    };
    let mut cfg = load_or_default(&path, optional)?;

    if let Some(dir) = &args.dir {
        cfg.discovery.dir = dir.clone();
    }
    if let Some(slots) = args.slots {
        cfg.supervisor.slots = usize::from(slots);
    }

    debug!(?cfg, "effective configuration");
    Ok(cfg)
}

/// Simple dry-run output: print settings and the command for each script.
fn print_dry_run(cfg: &ConfigFile, scripts: &[PathBuf]) {
    let sup = &cfg.supervisor;
    println!("slotrunner dry-run");
    println!("  supervisor.slots = {}", sup.slots);
    println!("  supervisor.max_buffer_size = {}", sup.max_buffer_size);
    println!("  timing.termination_timeout = {:?}", sup.timing.termination_timeout);
    println!();

    println!("scripts ({}):", scripts.len());
    for script in scripts {
        println!("  - {}", script.display());
        println!("      kind: {}", ScriptKind::from_path(script));
        println!("      cmd: {}", build_command(script));
    }

    debug!("dry-run complete (no execution)");
}
