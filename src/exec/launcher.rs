// src/exec/launcher.rs

//! Launch a script into an idle slot.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::exec::backend::ProcessBackend;
use crate::exec::collector::{Collector, CollectorGauge, CollectorSettings};
use crate::exec::command::build_command;
use crate::slot::ProcessSlot;
use crate::types::SlotStatus;

/// Start `script` in `slot`.
///
/// Returns `true` only if a process was spawned and its collector started.
/// An occupied or busy slot is rejected without any state change. A failed
/// spawn leaves the slot in `Error` with a diagnostic line in its output.
pub(crate) fn launch(
    slot: &Arc<ProcessSlot>,
    script: &Path,
    backend: &dyn ProcessBackend,
    settings: CollectorSettings,
    gauge: &CollectorGauge,
) -> bool {
    let index = slot.index();

    let Ok(runtime) = Handle::try_current() else {
        error!(slot = index, "cannot start a script outside of a Tokio runtime");
        return false;
    };

    // Held for the whole launch so terminate/cleanup never see a half-built slot.
    let Ok(_control) = slot.control().try_lock() else {
        warn!(slot = index, "slot is busy with another operation");
        return false;
    };

    let command = build_command(script);

    if !slot.begin_launch(&command) {
        warn!(slot = index, status = %slot.status(), "slot is already in use");
        return false;
    }

    info!(slot = index, script = %script.display(), "starting script");
    debug!(slot = index, cmd = %command, "executing command");

    let spawned = match backend.spawn(&command) {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(slot = index, cmd = %command, error = %e, "failed to start script");
            slot.push_output(format!("failed to launch {command}: {e}\n"));
            slot.transition(SlotStatus::Error);
            return false;
        }
    };

    let pid = spawned.handle.id();
    let process = Arc::new(Mutex::new(spawned.handle));
    slot.mark_running(pid, Arc::clone(&process));

    let collector = Collector {
        slot: Arc::clone(slot),
        process,
        stdout: spawned.stdout,
        stderr: spawned.stderr,
        cancel: slot.cancel_token(),
        settings,
        guard: gauge.enter(),
    };
    slot.set_collector(runtime.spawn(collector.run()));

    info!(slot = index, ?pid, "script started");
    true
}
