use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use slotrunner::config::{SupervisorConfig, Timing};
use tempfile::TempDir;

/// Builder for `SupervisorConfig` with timings short enough for tests.
pub struct SupervisorConfigBuilder {
    config: SupervisorConfig,
}

impl SupervisorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SupervisorConfig {
                slots: 2,
                max_buffer_size: 1000,
                read_chunk_size: 4096,
                timing: Timing {
                    poll_interval: Duration::from_millis(10),
                    graceful_window: Duration::from_millis(200),
                    termination_timeout: Duration::from_millis(500),
                    termination_poll_interval: Duration::from_millis(20),
                    kill_settle: Duration::from_millis(200),
                    reset_grace: Duration::from_millis(10),
                    collector_join_timeout: Duration::from_secs(1),
                },
            },
        }
    }

    pub fn slots(mut self, n: usize) -> Self {
        self.config.slots = n;
        self
    }

    pub fn max_buffer_size(mut self, n: usize) -> Self {
        self.config.max_buffer_size = n;
        self
    }

    pub fn read_chunk_size(mut self, n: usize) -> Self {
        self.config.read_chunk_size = n;
        self
    }

    pub fn poll_interval(mut self, d: Duration) -> Self {
        self.config.timing.poll_interval = d;
        self
    }

    pub fn graceful_window(mut self, d: Duration) -> Self {
        self.config.timing.graceful_window = d;
        self
    }

    pub fn termination_timeout(mut self, d: Duration) -> Self {
        self.config.timing.termination_timeout = d;
        self
    }

    pub fn kill_settle(mut self, d: Duration) -> Self {
        self.config.timing.kill_settle = d;
        self
    }

    pub fn build(self) -> SupervisorConfig {
        self.config
    }
}

impl Default for SupervisorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Temporary directory of script fixtures.
pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("creating temp script dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable file with exactly `contents`.
    pub fn executable(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.write(name, contents);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("chmod script fixture");
        path
    }

    /// Write `name.sh` (run through `bash` by extension) with `body`.
    pub fn shell(&self, name: &str, body: &str) -> PathBuf {
        self.executable(&format!("{name}.sh"), &format!("#!/bin/sh\n{body}\n"))
    }

    /// Write a non-executable file.
    pub fn plain(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.write(name, contents);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644))
            .expect("chmod script fixture");
        path
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("creating fixture dir");
        }
        fs::write(&path, contents).expect("writing script fixture");
        path
    }
}

impl Default for ScriptDir {
    fn default() -> Self {
        Self::new()
    }
}
