// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] maps a script path to the shell command line that runs it.
//! - [`backend`] provides the `ProcessBackend` / `ProcessHandle` traits and
//!   the real implementation over `tokio::process`.
//! - [`launcher`] claims a slot, spawns the process and starts its collector.
//! - [`collector`] drains a process's stdout/stderr into the slot buffer and
//!   records its exit.
//! - [`terminate`] stops a slot's process (SIGTERM, then SIGKILL) and
//!   returns the slot to idle.

pub mod backend;
pub(crate) mod collector;
pub mod command;
pub(crate) mod launcher;
pub mod terminate;

pub use backend::{
    OutputStream, ProcessBackend, ProcessHandle, RealProcessBackend, SpawnedProcess, StopSignal,
};
pub use command::{ScriptKind, build_command};
pub use terminate::TerminationOutcome;
