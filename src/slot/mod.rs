// src/slot/mod.rs

//! Per-slot state record.
//!
//! A [`ProcessSlot`] is created once when the supervisor is built and is
//! reused for every launch in that position. It keeps three groups of state,
//! each behind its own short-held lock:
//!
//! - scalar state (status, pid, command, exit code, start time),
//! - the bounded [`OutputBuffer`],
//! - run handles (process handle, cancellation token, collector task).
//!
//! None of these locks is held across an await, a pipe read or a signal.
//! Operations that drive a slot through several transitions (launch,
//! terminate, cleanup) are serialized by the async `control` lock.

pub mod buffer;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::exec::backend::ProcessHandle;
use crate::types::SlotStatus;

pub use buffer::OutputBuffer;

/// Process handle shared between the collector and the slot owner.
pub type SharedProcess = Arc<Mutex<Box<dyn ProcessHandle>>>;

/// Result of a non-blocking liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// The slot has no process attached.
    NoProcess,
    Alive,
    /// The process has exited and been reaped with this code.
    Exited(i32),
}

#[derive(Debug, Default)]
struct SlotState {
    status: SlotStatus,
    pid: Option<u32>,
    command: String,
    exit_code: Option<i32>,
    started_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct RunHandles {
    process: Option<SharedProcess>,
    cancel: CancellationToken,
    collector: Option<JoinHandle<()>>,
}

/// One execution slot of the supervisor's fixed pool.
#[derive(Debug)]
pub struct ProcessSlot {
    index: usize,
    state: Mutex<SlotState>,
    output: Mutex<OutputBuffer>,
    run: Mutex<RunHandles>,
    control: tokio::sync::Mutex<()>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding one of these short critical sections leaves
    // plain data behind; keep serving it.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProcessSlot {
    pub fn new(index: usize, max_buffer_size: usize) -> Self {
        Self {
            index,
            state: Mutex::new(SlotState::default()),
            output: Mutex::new(OutputBuffer::new(max_buffer_size)),
            run: Mutex::new(RunHandles::default()),
            control: tokio::sync::Mutex::new(()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn status(&self) -> SlotStatus {
        lock(&self.state).status
    }

    pub fn pid(&self) -> Option<u32> {
        lock(&self.state).pid
    }

    pub fn command(&self) -> String {
        lock(&self.state).command.clone()
    }

    pub fn exit_code(&self) -> Option<i32> {
        lock(&self.state).exit_code
    }

    /// Elapsed time since launch while the slot is active, zero otherwise.
    pub fn runtime(&self) -> Duration {
        let state = lock(&self.state);
        match (state.status.is_active(), state.started_at) {
            (true, Some(started)) => started.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Lock serializing multi-step operations (launch, terminate, cleanup).
    pub(crate) fn control(&self) -> &tokio::sync::Mutex<()> {
        &self.control
    }

    /// Move to `next` if the state machine allows it.
    ///
    /// Invalid transitions are logged and ignored.
    pub fn transition(&self, next: SlotStatus) -> bool {
        let mut state = lock(&self.state);
        if !state.status.can_transition_to(next) {
            warn!(
                slot = self.index,
                from = %state.status,
                to = %next,
                "rejected invalid slot status transition"
            );
            return false;
        }
        debug!(slot = self.index, from = %state.status, to = %next, "slot status transition");
        state.status = next;
        true
    }

    /// Record a reaped exit code on a running slot: `Finished` for 0,
    /// `Error` otherwise.
    ///
    /// Returns `false` (and changes nothing) if the slot is no longer
    /// `Running`, e.g. because another caller already recorded the exit.
    pub fn record_exit(&self, code: i32) -> bool {
        let mut state = lock(&self.state);
        if state.status != SlotStatus::Running {
            return false;
        }
        state.exit_code = Some(code);
        state.status = if code == 0 {
            SlotStatus::Finished
        } else {
            SlotStatus::Error
        };
        debug!(slot = self.index, exit_code = code, status = %state.status, "recorded process exit");
        true
    }

    /// Claim an idle slot for a new launch.
    ///
    /// Clears the previous run's output, installs a fresh cancellation token
    /// and moves `Idle -> Starting`. Returns `false` without side effects if
    /// the slot is occupied.
    pub(crate) fn begin_launch(&self, command: &str) -> bool {
        {
            let mut state = lock(&self.state);
            if state.status != SlotStatus::Idle {
                return false;
            }
            *state = SlotState {
                status: SlotStatus::Starting,
                command: command.to_string(),
                ..SlotState::default()
            };
        }

        lock(&self.output).clear();
        *lock(&self.run) = RunHandles::default();
        true
    }

    /// Attach a spawned process and move `Starting -> Running`.
    pub(crate) fn mark_running(&self, pid: Option<u32>, process: SharedProcess) {
        lock(&self.run).process = Some(process);

        let mut state = lock(&self.state);
        state.pid = pid;
        state.started_at = Some(Instant::now());
        if state.status.can_transition_to(SlotStatus::Running) {
            state.status = SlotStatus::Running;
        }
    }

    pub(crate) fn set_collector(&self, handle: JoinHandle<()>) {
        lock(&self.run).collector = Some(handle);
    }

    pub(crate) fn take_collector(&self) -> Option<JoinHandle<()>> {
        lock(&self.run).collector.take()
    }

    /// Cancellation token observed by the current collector.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        lock(&self.run).cancel.clone()
    }

    /// Ask the collector to stop at its next check.
    pub(crate) fn request_stop(&self) {
        lock(&self.run).cancel.cancel();
    }

    pub(crate) fn process(&self) -> Option<SharedProcess> {
        lock(&self.run).process.clone()
    }

    /// Non-blocking liveness probe of the attached process.
    ///
    /// A probe error (e.g. the child was reaped elsewhere) is treated as an
    /// exit with code -1 so the slot can never get stuck "alive".
    pub fn probe(&self) -> Liveness {
        let Some(process) = self.process() else {
            return Liveness::NoProcess;
        };
        probe_process(self.index, &process)
    }

    pub fn push_output(&self, chunk: impl Into<String>) {
        lock(&self.output).push(chunk);
    }

    /// Drain and concatenate all buffered chunks.
    pub fn drain_output(&self) -> String {
        lock(&self.output).drain()
    }

    pub fn clear_output(&self) {
        lock(&self.output).clear();
    }

    pub fn buffered_chunks(&self) -> usize {
        lock(&self.output).len()
    }

    /// Return the slot to `Idle`, dropping the process handle, command, exit
    /// code and buffered output.
    ///
    /// The collector must already have been joined.
    pub(crate) fn reset(&self) {
        self.reset_inner(true);
    }

    /// Like [`reset`](Self::reset) but keeps buffered output so a consumer
    /// can still read it (used by the cleanup pass for completion banners).
    pub(crate) fn reset_keep_output(&self) {
        self.reset_inner(false);
    }

    fn reset_inner(&self, clear_output: bool) {
        {
            let mut run = lock(&self.run);
            if run.collector.as_ref().is_some_and(|h| !h.is_finished()) {
                warn!(slot = self.index, "resetting slot with a live collector; aborting it");
            }
            if let Some(handle) = run.collector.take() {
                handle.abort();
            }
            run.cancel.cancel();
            *run = RunHandles::default();
        }

        {
            let mut state = lock(&self.state);
            if state.status != SlotStatus::Idle && !state.status.can_transition_to(SlotStatus::Idle) {
                warn!(slot = self.index, from = %state.status, "forcing slot reset from non-terminal status");
            }
            *state = SlotState::default();
        }

        if clear_output {
            lock(&self.output).clear();
        }

        debug!(slot = self.index, clear_output, "slot reset to idle");
    }
}

pub(crate) fn probe_process(slot: usize, process: &SharedProcess) -> Liveness {
    let mut handle = lock(process);
    match handle.try_wait() {
        Ok(None) => Liveness::Alive,
        Ok(Some(code)) => Liveness::Exited(code),
        Err(e) => {
            warn!(slot, error = %e, "liveness probe failed; treating process as exited");
            Liveness::Exited(-1)
        }
    }
}

/// Lock a shared process handle.
pub(crate) fn lock_process(process: &SharedProcess) -> MutexGuard<'_, Box<dyn ProcessHandle>> {
    lock(process)
}
