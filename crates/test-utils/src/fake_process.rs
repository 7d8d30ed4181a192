use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

use slotrunner::errors::{Result, SlotrunnerError};
use slotrunner::exec::{ProcessBackend, ProcessHandle, SpawnedProcess, StopSignal};

/// How a fake process reacts to stop signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeBehaviour {
    /// Ignore SIGTERM (keep running until killed).
    pub ignore_graceful: bool,
    /// Survive SIGKILL as well.
    pub unkillable: bool,
}

#[derive(Debug)]
struct FakeState {
    pid: u32,
    exit_code: Option<i32>,
    signals: Vec<StopSignal>,
    behaviour: FakeBehaviour,
    stdout: Option<mpsc::UnboundedSender<Vec<u8>>>,
    stderr: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl FakeState {
    fn exit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            self.exit_code = Some(code);
        }
        // Dropping the senders closes both pipes (EOF for the reader).
        self.stdout = None;
        self.stderr = None;
    }
}

/// Test-side handle to a process spawned by [`FakeProcessBackend`].
///
/// Lets a test write to the process's stdout/stderr, make it exit, and
/// inspect which signals the supervisor delivered.
#[derive(Debug, Clone)]
pub struct FakeControl {
    command: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeControl {
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> u32 {
        self.state.lock().unwrap().pid
    }

    pub fn write_stdout(&self, text: &str) {
        if let Some(tx) = &self.state.lock().unwrap().stdout {
            let _ = tx.send(text.as_bytes().to_vec());
        }
    }

    pub fn write_stderr(&self, text: &str) {
        if let Some(tx) = &self.state.lock().unwrap().stderr {
            let _ = tx.send(text.as_bytes().to_vec());
        }
    }

    /// Make the process exit with `code`, closing its pipes.
    pub fn exit(&self, code: i32) {
        self.state.lock().unwrap().exit(code);
    }

    /// Make the process exit with `code` but keep its pipes open, like a
    /// script whose background child still holds stdout.
    pub fn exit_keep_pipes(&self, code: i32) {
        let mut state = self.state.lock().unwrap();
        if state.exit_code.is_none() {
            state.exit_code = Some(code);
        }
    }

    /// Close stdout and stderr without changing the exit state.
    pub fn close_pipes(&self) {
        let mut state = self.state.lock().unwrap();
        state.stdout = None;
        state.stderr = None;
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.state.lock().unwrap().exit_code
    }

    pub fn is_alive(&self) -> bool {
        self.exit_code().is_none()
    }

    pub fn signals(&self) -> Vec<StopSignal> {
        self.state.lock().unwrap().signals.clone()
    }
}

/// [`ProcessHandle`] the supervisor sees for a fake process.
#[derive(Debug)]
pub struct FakeProcess {
    state: Arc<Mutex<FakeState>>,
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state.exit_code.is_none().then_some(state.pid)
    }

    fn try_wait(&mut self) -> io::Result<Option<i32>> {
        Ok(self.state.lock().unwrap().exit_code)
    }

    fn signal(&mut self, signal: StopSignal) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.signals.push(signal);
        if state.exit_code.is_some() {
            return Ok(());
        }
        match signal {
            StopSignal::Graceful if !state.behaviour.ignore_graceful => state.exit(143),
            StopSignal::Forceful if !state.behaviour.unkillable => state.exit(137),
            _ => {}
        }
        Ok(())
    }
}

/// `AsyncRead` over a channel of byte chunks; EOF once every sender is gone.
#[derive(Debug)]
struct ChannelReader {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl AsyncRead for ChannelReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        while this.pos >= this.pending.len() {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    this.pending = chunk;
                    this.pos = 0;
                }
                // All senders dropped: leave `buf` empty to signal EOF.
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }

        let n = buf.remaining().min(this.pending.len() - this.pos);
        buf.put_slice(&this.pending[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

#[derive(Debug, Default)]
struct Inner {
    spawned: Vec<FakeControl>,
    failures: VecDeque<io::ErrorKind>,
    behaviour: FakeBehaviour,
    next_pid: u32,
}

/// A process backend that never touches the OS.
///
/// - records every command it was asked to spawn
/// - hands out [`FakeControl`]s so tests drive output and exit
/// - can be told to fail upcoming spawns
#[derive(Debug, Default)]
pub struct FakeProcessBackend {
    inner: Mutex<Inner>,
}

impl FakeProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaviour applied to processes spawned from now on.
    pub fn set_behaviour(&self, behaviour: FakeBehaviour) {
        self.inner.lock().unwrap().behaviour = behaviour;
    }

    /// Make the next spawn fail with an error of `kind`.
    pub fn fail_next_spawn(&self, kind: io::ErrorKind) {
        self.inner.lock().unwrap().failures.push_back(kind);
    }

    pub fn spawn_count(&self) -> usize {
        self.inner.lock().unwrap().spawned.len()
    }

    /// Control handle of the `n`-th spawned process.
    pub fn control(&self, n: usize) -> FakeControl {
        self.inner.lock().unwrap().spawned[n].clone()
    }

    pub fn last_control(&self) -> Option<FakeControl> {
        self.inner.lock().unwrap().spawned.last().cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .spawned
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }
}

impl ProcessBackend for FakeProcessBackend {
    fn spawn(&self, command: &str) -> Result<SpawnedProcess> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(kind) = inner.failures.pop_front() {
            return Err(SlotrunnerError::SpawnError {
                command: command.to_string(),
                source: io::Error::new(kind, "fake spawn failure"),
            });
        }

        inner.next_pid += 1;
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();

        let state = Arc::new(Mutex::new(FakeState {
            pid: 10_000 + inner.next_pid,
            exit_code: None,
            signals: Vec::new(),
            behaviour: inner.behaviour,
            stdout: Some(out_tx),
            stderr: Some(err_tx),
        }));

        inner.spawned.push(FakeControl {
            command: command.to_string(),
            state: Arc::clone(&state),
        });

        Ok(SpawnedProcess {
            handle: Box::new(FakeProcess { state }),
            stdout: Box::pin(ChannelReader {
                rx: out_rx,
                pending: Vec::new(),
                pos: 0,
            }),
            stderr: Box::pin(ChannelReader {
                rx: err_rx,
                pending: Vec::new(),
                pos: 0,
            }),
        })
    }
}
