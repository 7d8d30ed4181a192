// src/supervisor/mod.rs

//! Supervisor façade over a fixed pool of process slots.
//!
//! Callers start scripts into numbered slots, poll them for status and
//! output, and terminate them. Output collection happens on one background
//! Tokio task per occupied slot, so none of the query methods block on
//! process I/O.
//!
//! Slot indices are a contract: passing an index outside `0..slot_count()`
//! panics.

mod cleanup;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{SupervisorConfig, validate_supervisor_config};
use crate::errors::Result;
use crate::exec::backend::{ProcessBackend, RealProcessBackend, StopSignal};
use crate::exec::collector::{CollectorGauge, CollectorSettings};
use crate::exec::launcher::launch;
use crate::exec::terminate::{TerminationOutcome, terminate_slot};
use crate::slot::{Liveness, ProcessSlot, lock_process};
use crate::types::SlotStatus;

pub use cleanup::{CleanedSlot, completion_banner};

/// Owns the slot pool and exposes the caller-facing API.
#[derive(Debug)]
pub struct Supervisor {
    slots: Vec<Arc<ProcessSlot>>,
    config: SupervisorConfig,
    backend: Arc<dyn ProcessBackend>,
    collectors: CollectorGauge,
}

impl Supervisor {
    /// Build a supervisor that runs real OS processes.
    pub fn new(config: SupervisorConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(RealProcessBackend))
    }

    /// Build a supervisor over a custom process backend.
    pub fn with_backend(config: SupervisorConfig, backend: Arc<dyn ProcessBackend>) -> Result<Self> {
        validate_supervisor_config(&config)?;

        let slots = (0..config.slots)
            .map(|i| Arc::new(ProcessSlot::new(i, config.max_buffer_size)))
            .collect();

        info!(slots = config.slots, "supervisor initialized");

        Ok(Self {
            slots,
            config,
            backend,
            collectors: CollectorGauge::default(),
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, index: usize) -> &Arc<ProcessSlot> {
        assert!(
            index < self.slots.len(),
            "invalid slot index: {index} (must be 0-{})",
            self.slots.len() - 1
        );
        &self.slots[index]
    }

    fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            poll_interval: self.config.timing.poll_interval,
            read_chunk_size: self.config.read_chunk_size,
        }
    }

    /// Launch `path` in slot `index`.
    ///
    /// Returns `false` if the slot is occupied or the launch failed; see
    /// [`status`](Self::status) and [`new_output`](Self::new_output) for the
    /// reason. Must be called from within a Tokio runtime.
    pub fn start(&self, path: impl AsRef<Path>, index: usize) -> bool {
        let slot = self.slot(index);
        launch(
            slot,
            path.as_ref(),
            self.backend.as_ref(),
            self.collector_settings(),
            &self.collectors,
        )
    }

    /// Stop whatever runs in slot `index` and return the slot to `Idle`.
    ///
    /// Idempotent: an idle slot is a logged no-op.
    pub async fn terminate(&self, index: usize) -> TerminationOutcome {
        let slot = self.slot(index);
        terminate_slot(slot, &self.config.timing).await
    }

    /// `true` while the slot is `Starting` or `Running`.
    ///
    /// If the process has already exited but the collector has not recorded
    /// it yet, the exit is recorded here and `false` is returned.
    pub fn is_running(&self, index: usize) -> bool {
        let slot = self.slot(index);
        match slot.status() {
            SlotStatus::Starting => true,
            SlotStatus::Running => match slot.probe() {
                Liveness::Exited(code) => {
                    if slot.record_exit(code) {
                        debug!(slot = index, exit_code = code, "process detected as finished in is_running");
                    }
                    false
                }
                Liveness::Alive | Liveness::NoProcess => true,
            },
            _ => false,
        }
    }

    /// Drain all buffered output of slot `index`, oldest first.
    ///
    /// Returns an empty string when nothing new arrived.
    pub fn new_output(&self, index: usize) -> String {
        self.slot(index).drain_output()
    }

    /// Discard buffered output without touching the process.
    pub fn clear_output(&self, index: usize) {
        self.slot(index).clear_output();
        debug!(slot = index, "cleared output buffer");
    }

    pub fn status(&self, index: usize) -> SlotStatus {
        self.slot(index).status()
    }

    /// Time since launch while the slot is active, zero otherwise.
    pub fn runtime(&self, index: usize) -> Duration {
        self.slot(index).runtime()
    }

    /// Command line launched in slot `index` (empty when idle).
    pub fn command(&self, index: usize) -> String {
        self.slot(index).command()
    }

    pub fn exit_code(&self, index: usize) -> Option<i32> {
        self.slot(index).exit_code()
    }

    pub fn pid(&self, index: usize) -> Option<u32> {
        self.slot(index).pid()
    }

    /// Number of output chunks currently buffered for slot `index`.
    pub fn buffered_chunks(&self, index: usize) -> usize {
        self.slot(index).buffered_chunks()
    }

    /// Number of collector tasks currently alive.
    pub fn active_collectors(&self) -> usize {
        self.collectors.current()
    }

    /// Reset every `Finished` / `Error` slot to `Idle`, leaving a completion
    /// banner as the last buffered output. Returns how many slots were
    /// cleaned.
    pub async fn cleanup_finished_processes(&self) -> usize {
        self.cleanup_finished_slots().await.len()
    }

    /// Same pass as [`cleanup_finished_processes`](Self::cleanup_finished_processes),
    /// reporting which slots were reset and how their runs ended.
    pub async fn cleanup_finished_slots(&self) -> Vec<CleanedSlot> {
        cleanup::cleanup_finished(&self.slots, &self.config.timing).await
    }

    /// Terminate every occupied slot.
    pub async fn shutdown(&self) {
        info!("supervisor shutting down");
        for slot in &self.slots {
            if slot.status() != SlotStatus::Idle {
                terminate_slot(slot, &self.config.timing).await;
            }
        }
        info!("supervisor shutdown complete");
    }
}

impl Drop for Supervisor {
    /// Last-resort cleanup for supervisors dropped without `shutdown`:
    /// stop collectors and kill every process group still attached to a slot.
    fn drop(&mut self) {
        for slot in &self.slots {
            slot.request_stop();

            // The group may outlive its leader, so signal it even when the
            // leader has already exited.
            if let Some(process) = slot.process() {
                if matches!(slot.probe(), Liveness::Alive) {
                    warn!(slot = slot.index(), pid = ?slot.pid(), "killing process left running at drop");
                } else {
                    debug!(slot = slot.index(), "killing leftover process group at drop");
                }
                let res = lock_process(&process).signal(StopSignal::Forceful);
                if let Err(e) = res {
                    warn!(slot = slot.index(), error = %e, "failed to kill process at drop");
                }
            }

            if let Some(handle) = slot.take_collector() {
                handle.abort();
            }
        }
    }
}
