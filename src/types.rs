// src/types.rs

use std::fmt;

/// Lifecycle status of a process slot.
///
/// A slot moves along one of two paths and then back to `Idle`:
///
/// - `Idle -> Starting -> Running -> Finished | Error -> Idle`
/// - `Idle -> Starting -> Running -> Terminated -> Idle`
///
/// `Starting -> Error` is also allowed for launches that fail before a
/// process exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotStatus {
    /// No process occupies the slot.
    #[default]
    Idle,
    /// A launch is in progress.
    Starting,
    /// The process is running and its output is being collected.
    Running,
    /// The process exited with code 0.
    Finished,
    /// The process exited non-zero, died from a signal, or failed to launch.
    Error,
    /// The process was stopped through `terminate`.
    Terminated,
}

impl SlotStatus {
    /// `Starting` or `Running`.
    pub fn is_active(self) -> bool {
        matches!(self, SlotStatus::Starting | SlotStatus::Running)
    }

    /// `Finished` or `Error`: the process is gone and the slot awaits a reset.
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotStatus::Finished | SlotStatus::Error)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: SlotStatus) -> bool {
        use SlotStatus::*;

        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Error)
                | (Running, Finished)
                | (Running, Error)
                | (Running, Terminated)
                | (Finished, Idle)
                | (Error, Idle)
                | (Terminated, Idle)
        )
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotStatus::Idle => "idle",
            SlotStatus::Starting => "starting",
            SlotStatus::Running => "running",
            SlotStatus::Finished => "finished",
            SlotStatus::Error => "error",
            SlotStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}
