// src/exec/backend.rs

//! Pluggable process backend abstraction.
//!
//! The supervisor never touches OS process primitives directly. It asks a
//! [`ProcessBackend`] to spawn a shell command and gets back a
//! [`ProcessHandle`] (liveness probe, reaping, signals) plus the readable
//! ends of the stdout/stderr pipes.
//!
//! - [`RealProcessBackend`] is the production implementation: `sh -c` via
//!   `tokio::process::Command`, with stop signals delivered to the child's
//!   process group through `nix`.
//! - Tests can provide their own backend that hands out scripted fake
//!   processes and in-memory streams.

use std::fmt::Debug;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::{Result, SlotrunnerError};

/// Readable end of one of the child's output pipes.
pub type OutputStream = Pin<Box<dyn AsyncRead + Send>>;

/// Which kind of stop request to deliver to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// Catchable request to exit (SIGTERM).
    Graceful,
    /// Uncatchable kill (SIGKILL).
    Forceful,
}

/// Capabilities the supervisor needs from a running OS process.
pub trait ProcessHandle: Send + Debug {
    /// OS process id, if the process has not been reaped yet.
    fn id(&self) -> Option<u32>;

    /// Non-blocking liveness probe.
    ///
    /// Returns `Ok(None)` while the process is alive and `Ok(Some(code))`
    /// once it has exited (reaping it). Calling again after exit returns the
    /// same code.
    fn try_wait(&mut self) -> io::Result<Option<i32>>;

    /// Deliver a stop signal. Signalling an already-exited process is `Ok`.
    fn signal(&mut self, signal: StopSignal) -> io::Result<()>;
}

/// A freshly spawned process with both output pipes attached.
pub struct SpawnedProcess {
    pub handle: Box<dyn ProcessHandle>,
    pub stdout: OutputStream,
    pub stderr: OutputStream,
}

impl Debug for SpawnedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// Trait abstracting how shell commands are turned into processes.
///
/// Production code uses [`RealProcessBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ProcessBackend: Send + Sync + Debug {
    /// Spawn `command` through a shell with stdout and stderr piped.
    ///
    /// Must be called from within a Tokio runtime.
    fn spawn(&self, command: &str) -> Result<SpawnedProcess>;
}

/// Real process backend used in production.
///
/// The command runs as `sh -c "exec <command>"` in a new process group:
/// the shell replaces itself with the command, so the reported pid is the
/// script's interpreter, and stop signals go to the whole group so helpers
/// the script started are stopped with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessBackend;

impl ProcessBackend for RealProcessBackend {
    fn spawn(&self, command: &str) -> Result<SpawnedProcess> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(format!("exec {command}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let spawn_err = |source: io::Error| SlotrunnerError::SpawnError {
            command: command.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_err)?;

        // Both pipes were requested, so these are always present. If they
        // are not, dropping `child` kills it (kill_on_drop).
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("stdout pipe not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err(io::Error::other("stderr pipe not captured")))?;

        // process_group(0) makes the child its own group leader.
        let group = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .map(Pid::from_raw);

        debug!(pid = ?child.id(), cmd = %command, "spawned shell process");

        Ok(SpawnedProcess {
            handle: Box::new(RealProcess { child, group }),
            stdout: Box::pin(stdout),
            stderr: Box::pin(stderr),
        })
    }
}

/// [`ProcessHandle`] over a `tokio::process::Child` leading its own
/// process group.
#[derive(Debug)]
pub struct RealProcess {
    child: Child,
    group: Option<Pid>,
}

impl RealProcess {
    fn signal_group(&mut self, sig: Signal) -> io::Result<()> {
        let Some(group) = self.group else {
            return Ok(());
        };
        match signal::killpg(group, sig) {
            // Nobody left in the group.
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ProcessHandle for RealProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(exit_code_of))
    }

    fn signal(&mut self, stop: StopSignal) -> io::Result<()> {
        match stop {
            StopSignal::Graceful => self.signal_group(Signal::SIGTERM),
            StopSignal::Forceful => {
                if self.group.is_some() {
                    return self.signal_group(Signal::SIGKILL);
                }
                match self.child.start_kill() {
                    Ok(()) => Ok(()),
                    // Already reaped: nothing left to kill.
                    Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

/// Map an exit status to a single code: the exit code, or `128 + signal`
/// for processes killed by a signal.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}
