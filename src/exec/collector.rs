// src/exec/collector.rs

//! Per-slot output collector.
//!
//! One collector task runs for each occupied slot. Each iteration it waits,
//! for at most `poll_interval`, on whichever of stdout/stderr has data or on
//! the slot's cancellation token. Then it probes the process without
//! blocking. A bounded wait keeps cancellation latency low without
//! busy-spinning.
//!
//! The collector only finalizes `status` / `exit_code` after a natural exit.
//! It never resets the slot; that is left to `terminate` or the cleanup
//! pass, which join it first.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::exec::backend::OutputStream;
use crate::slot::{Liveness, ProcessSlot, SharedProcess, probe_process};

/// Knobs the collector loop needs from the supervisor config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CollectorSettings {
    pub poll_interval: Duration,
    pub read_chunk_size: usize,
}

/// Counts live collector tasks across the supervisor.
#[derive(Debug, Clone, Default)]
pub(crate) struct CollectorGauge(Arc<AtomicUsize>);

impl CollectorGauge {
    pub fn enter(&self) -> CollectorGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        CollectorGuard(Arc::clone(&self.0))
    }

    pub fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Decrements the gauge when the collector future is dropped, including
/// when its task is aborted.
#[derive(Debug)]
pub(crate) struct CollectorGuard(Arc<AtomicUsize>);

impl Drop for CollectorGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Everything a collector task owns for one launch.
pub(crate) struct Collector {
    pub slot: Arc<ProcessSlot>,
    pub process: SharedProcess,
    pub stdout: OutputStream,
    pub stderr: OutputStream,
    pub cancel: CancellationToken,
    pub settings: CollectorSettings,
    pub guard: CollectorGuard,
}

impl Collector {
    pub async fn run(self) {
        let Collector {
            slot,
            process,
            mut stdout,
            mut stderr,
            cancel,
            settings,
            guard: _guard,
        } = self;

        let index = slot.index();
        debug!(slot = index, "output collector started");

        let mut out_buf = vec![0u8; settings.read_chunk_size];
        let mut err_buf = vec![0u8; settings.read_chunk_size];
        let mut stdout_open = true;
        let mut stderr_open = true;

        loop {
            if cancel.is_cancelled() {
                debug!(slot = index, "stop requested; collector exiting");
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(slot = index, "stop requested; collector exiting");
                    break;
                }
                res = stdout.read(&mut out_buf), if stdout_open => {
                    stdout_open = store_read(&slot, Stream::Stdout, res, &out_buf);
                }
                res = stderr.read(&mut err_buf), if stderr_open => {
                    stderr_open = store_read(&slot, Stream::Stderr, res, &err_buf);
                }
                _ = sleep(settings.poll_interval) => {}
            }

            // Liveness is checked every iteration, independent of I/O.
            if let Liveness::Exited(code) = probe_process(index, &process) {
                if cancel.is_cancelled() {
                    // Termination is in charge of the final status.
                    break;
                }

                // Pick up whatever the process wrote just before exiting.
                if stdout_open {
                    drain_stream(&slot, Stream::Stdout, &mut stdout, &mut out_buf, settings.poll_interval).await;
                }
                if stderr_open {
                    drain_stream(&slot, Stream::Stderr, &mut stderr, &mut err_buf, settings.poll_interval).await;
                }

                if slot.record_exit(code) {
                    info!(
                        slot = index,
                        exit_code = code,
                        success = code == 0,
                        "script process exited"
                    );
                }
                break;
            }
        }

        debug!(slot = index, "output collector finished");
    }
}

/// Store the result of one read. Returns whether the stream is still open.
fn store_read(slot: &ProcessSlot, stream: Stream, res: io::Result<usize>, buf: &[u8]) -> bool {
    match res {
        Ok(0) => {
            debug!(slot = slot.index(), stream = stream.name(), "end of stream");
            false
        }
        Ok(n) => {
            slot.push_output(String::from_utf8_lossy(&buf[..n]).into_owned());
            true
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => true,
        Err(e) => {
            warn!(
                slot = slot.index(),
                stream = stream.name(),
                error = %e,
                "read failed; no longer monitoring stream"
            );
            false
        }
    }
}

/// Read a stream to EOF, giving up after `limit`.
///
/// A grandchild that inherited the pipe can keep it open after the script
/// itself exited, hence the bound.
async fn drain_stream(
    slot: &ProcessSlot,
    stream: Stream,
    reader: &mut OutputStream,
    buf: &mut [u8],
    limit: Duration,
) {
    let drained = timeout(limit, async {
        loop {
            let res = reader.read(buf).await;
            if !store_read(slot, stream, res, buf) {
                break;
            }
        }
    })
    .await;

    if drained.is_err() {
        debug!(
            slot = slot.index(),
            stream = stream.name(),
            "stream still open after process exit; stopped draining"
        );
    }
}
