// src/runner.rs

//! Headless front end over the supervisor.
//!
//! Feeds a FIFO queue of scripts into idle slots, streams drained output to
//! a writer with a `[slot N]` prefix per line, and runs the cleanup pass on
//! every tick until the queue is empty and every slot is idle.

use std::collections::VecDeque;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::supervisor::{CleanedSlot, Supervisor};
use crate::types::SlotStatus;

/// How often the runner polls the supervisor.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// What happened to the scripts handed to [`run_scripts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    /// Scripts that never got a slot because of a shutdown request.
    pub skipped: Vec<PathBuf>,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && !self.interrupted
    }

    /// Process exit code for the CLI: 130 when interrupted, 1 when any
    /// script failed, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted {
            130
        } else if !self.failed.is_empty() {
            1
        } else {
            0
        }
    }
}

/// Per-slot bookkeeping on the runner side.
#[derive(Debug, Default)]
struct SlotView {
    script: Option<PathBuf>,
    at_line_start: bool,
}

/// Run `scripts` through `supervisor`, writing their output to `out`.
///
/// Resolves when all scripts have finished, or when `shutdown` completes;
/// in that case every occupied slot is terminated first.
pub async fn run_scripts<W, F>(
    supervisor: &Supervisor,
    scripts: Vec<PathBuf>,
    out: &mut W,
    tick: Duration,
    shutdown: F,
) -> Result<RunSummary>
where
    W: Write,
    F: Future<Output = ()>,
{
    let mut queue: VecDeque<PathBuf> = scripts.into();
    let mut views: Vec<SlotView> = (0..supervisor.slot_count())
        .map(|_| SlotView {
            script: None,
            at_line_start: true,
        })
        .collect();
    let mut summary = RunSummary::default();

    info!(queued = queue.len(), slots = views.len(), "runner started");

    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(tick);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested; terminating running scripts");
                flush_output(supervisor, &mut views, out)?;
                supervisor.shutdown().await;
                for view in views.iter_mut() {
                    if let Some(script) = view.script.take() {
                        summary.failed.push(script);
                    }
                }
                summary.skipped.extend(queue.drain(..));
                summary.interrupted = true;
                break;
            }
            _ = ticker.tick() => {}
        }

        fill_idle_slots(supervisor, &mut views, &mut queue, &mut summary);
        let cleaned = supervisor.cleanup_finished_slots().await;
        record_outcomes(&cleaned, &mut views, &mut summary);
        flush_output(supervisor, &mut views, out)?;

        let all_idle = (0..supervisor.slot_count()).all(|i| supervisor.status(i) == SlotStatus::Idle);
        if queue.is_empty() && all_idle {
            debug!("queue empty and all slots idle");
            break;
        }
    }

    out.flush()?;
    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped.len(),
        interrupted = summary.interrupted,
        "runner finished"
    );
    Ok(summary)
}

fn fill_idle_slots(
    supervisor: &Supervisor,
    views: &mut [SlotView],
    queue: &mut VecDeque<PathBuf>,
    summary: &mut RunSummary,
) {
    for (index, view) in views.iter_mut().enumerate() {
        if queue.is_empty() {
            return;
        }
        if supervisor.status(index) != SlotStatus::Idle || view.script.is_some() {
            continue;
        }
        let Some(script) = queue.pop_front() else {
            return;
        };

        let started = supervisor.start(&script, index);
        if started || supervisor.status(index) == SlotStatus::Error {
            // A failed launch leaves the slot in `Error`; the outcome is
            // recorded like any other failure.
            view.script = Some(script);
        } else {
            warn!(slot = index, script = %script.display(), "could not start script");
            summary.failed.push(script);
        }
    }
}

/// Attribute each slot the cleanup pass reset to the script it ran.
fn record_outcomes(cleaned: &[CleanedSlot], views: &mut [SlotView], summary: &mut RunSummary) {
    for slot in cleaned {
        let Some(script) = views[slot.index].script.take() else {
            continue;
        };
        if slot.succeeded() {
            summary.succeeded.push(script);
        } else {
            debug!(slot = slot.index, exit_code = ?slot.exit_code, "script failed");
            summary.failed.push(script);
        }
    }
}

fn flush_output<W: Write>(supervisor: &Supervisor, views: &mut [SlotView], out: &mut W) -> Result<()> {
    for (index, view) in views.iter_mut().enumerate() {
        let text = supervisor.new_output(index);
        if text.is_empty() {
            continue;
        }
        write_prefixed(out, &format!("[slot {index}] "), &text, &mut view.at_line_start)?;
    }
    out.flush()?;
    Ok(())
}

/// Write `text` with `prefix` at the start of every line.
///
/// `at_line_start` carries line state across chunks, which may split lines.
pub fn write_prefixed<W: Write>(
    out: &mut W,
    prefix: &str,
    text: &str,
    at_line_start: &mut bool,
) -> std::io::Result<()> {
    for piece in text.split_inclusive('\n') {
        if *at_line_start {
            out.write_all(prefix.as_bytes())?;
        }
        out.write_all(piece.as_bytes())?;
        *at_line_start = piece.ends_with('\n');
    }
    Ok(())
}
