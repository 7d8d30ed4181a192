// src/exec/terminate.rs

//! Graceful-then-forceful shutdown of a slot's process.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::config::{MAX_TIMING, Timing};
use crate::exec::backend::StopSignal;
use crate::slot::{Liveness, ProcessSlot, SharedProcess, lock_process, probe_process};
use crate::types::SlotStatus;

/// How a `terminate` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The slot was idle; nothing to do.
    NotRunning,
    /// The process had already exited; only cleanup was performed.
    AlreadyExited,
    /// The process exited after SIGTERM.
    Graceful,
    /// The process had to be killed with SIGKILL.
    Killed,
    /// SIGKILL could not be delivered or did not take effect in time.
    /// Cleanup still ran.
    KillFailed,
}

impl TerminationOutcome {
    /// Whether a forceful kill was attempted.
    pub fn was_forced(self) -> bool {
        matches!(self, TerminationOutcome::Killed | TerminationOutcome::KillFailed)
    }
}

/// Stop the process in `slot` and return the slot to `Idle`.
///
/// Safe to call on an idle or already-finished slot. Blocks the calling task
/// for at most `timing.termination_budget()`.
pub(crate) async fn terminate_slot(slot: &ProcessSlot, timing: &Timing) -> TerminationOutcome {
    let index = slot.index();
    let _control = slot.control().lock().await;

    let status = slot.status();
    match status {
        SlotStatus::Idle => {
            warn!(slot = index, "no script running in slot; nothing to terminate");
            return TerminationOutcome::NotRunning;
        }
        SlotStatus::Finished | SlotStatus::Error => {
            debug!(slot = index, %status, "process already finished; skipping signals");
            join_collector(slot, timing).await;
            slot.reset();
            return TerminationOutcome::AlreadyExited;
        }
        _ => {}
    }

    info!(slot = index, pid = ?slot.pid(), "terminating script");

    slot.request_stop();

    let outcome = match slot.process() {
        Some(process) => stop_process(index, &process, timing).await,
        None => TerminationOutcome::AlreadyExited,
    };

    // Dropping the collector's pipe ends closes both descriptors.
    join_collector(slot, timing).await;

    // The collector may have recorded a natural exit before it noticed the
    // stop request; such a slot goes straight back to idle.
    if slot.status() == SlotStatus::Running {
        slot.transition(SlotStatus::Terminated);
    }

    info!(slot = index, ?outcome, "script terminated");

    if outcome.was_forced() {
        sleep(timing.reset_grace).await;
    }
    slot.reset();

    outcome
}

/// SIGTERM, poll, escalate to SIGKILL.
async fn stop_process(index: usize, process: &SharedProcess, timing: &Timing) -> TerminationOutcome {
    if let Liveness::Exited(code) = probe_process(index, process) {
        debug!(slot = index, exit_code = code, "process already dead; skipping signals");
        return TerminationOutcome::AlreadyExited;
    }

    let pid = lock_process(process).id();
    debug!(slot = index, ?pid, "sending SIGTERM");
    let sent = lock_process(process).signal(StopSignal::Graceful);
    if let Err(e) = sent {
        warn!(slot = index, ?pid, error = %e, "failed to deliver SIGTERM");
    }

    // Short first window, then the rest of the overall budget.
    if wait_for_exit(index, process, timing.graceful_window, timing.termination_poll_interval).await {
        debug!(slot = index, ?pid, "process terminated gracefully");
        return TerminationOutcome::Graceful;
    }

    debug!(slot = index, ?pid, "process still alive after graceful window; waiting longer");
    let remaining = timing.termination_timeout.saturating_sub(timing.graceful_window);
    if wait_for_exit(index, process, remaining, timing.termination_poll_interval).await {
        debug!(slot = index, ?pid, "process terminated gracefully");
        return TerminationOutcome::Graceful;
    }

    warn!(slot = index, ?pid, "process did not terminate gracefully; sending SIGKILL");
    let killed = lock_process(process).signal(StopSignal::Forceful);
    if let Err(e) = killed {
        error!(slot = index, ?pid, error = %e, "failed to kill process");
        return TerminationOutcome::KillFailed;
    }

    if wait_for_exit(index, process, timing.kill_settle, timing.termination_poll_interval).await {
        TerminationOutcome::Killed
    } else {
        error!(slot = index, ?pid, "process survived SIGKILL");
        TerminationOutcome::KillFailed
    }
}

/// Poll liveness every `interval` for up to `window`. Returns `true` as soon
/// as the process is gone.
async fn wait_for_exit(
    index: usize,
    process: &SharedProcess,
    window: Duration,
    interval: Duration,
) -> bool {
    // Clamped so configs built in code without validation cannot overflow.
    let deadline = Instant::now() + window.min(MAX_TIMING);
    loop {
        if !matches!(probe_process(index, process), Liveness::Alive) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(interval.min(deadline - now)).await;
    }
}

/// Join the slot's collector, aborting it if it does not stop in time.
pub(crate) async fn join_collector(slot: &ProcessSlot, timing: &Timing) {
    let Some(mut handle) = slot.take_collector() else {
        return;
    };

    match timeout(timing.collector_join_timeout, &mut handle).await {
        Ok(Ok(())) => debug!(slot = slot.index(), "collector joined"),
        Ok(Err(e)) => warn!(slot = slot.index(), error = %e, "collector task failed"),
        Err(_) => {
            warn!(slot = slot.index(), "collector did not stop in time; aborting it");
            handle.abort();
        }
    }
}
