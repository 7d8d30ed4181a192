// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [supervisor]
/// slots = 2
/// max_buffer_size = 1000
///
/// [timing]
/// poll_interval = "50ms"
/// termination_timeout = "10s"
///
/// [discovery]
/// dir = "scripts"
/// ```
///
/// All sections are optional and have reasonable defaults. This is the
/// unchecked form; convert it into a [`ConfigFile`] with `TryFrom` to run
/// validation and parse durations.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub supervisor: SupervisorSection,

    #[serde(default)]
    pub timing: TimingSection,

    #[serde(default)]
    pub discovery: DiscoverySection,
}

/// `[supervisor]` section: pool and buffer sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupervisorSection {
    /// Number of execution slots in the pool.
    #[serde(default = "default_slots")]
    pub slots: usize,

    /// Maximum number of output chunks retained per slot.
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// Bytes requested per pipe read.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_slots() -> usize {
    2
}

fn default_max_buffer_size() -> usize {
    1000
}

fn default_read_chunk_size() -> usize {
    4096
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            max_buffer_size: default_max_buffer_size(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

/// `[timing]` section. Every value is a duration string such as `"250ms"`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TimingSection {
    pub poll_interval: Option<String>,
    pub graceful_window: Option<String>,
    pub termination_timeout: Option<String>,
    pub termination_poll_interval: Option<String>,
    pub kill_settle: Option<String>,
    pub reset_grace: Option<String>,
    pub collector_join_timeout: Option<String>,
}

/// `[discovery]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoverySection {
    #[serde(default = "default_discovery_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_discovery_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_recursive() -> bool {
    true
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            dir: default_discovery_dir(),
            recursive: default_recursive(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub supervisor: SupervisorConfig,
    pub discovery: DiscoveryConfig,
}

/// Everything the supervisor core needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub slots: usize,
    pub max_buffer_size: usize,
    pub read_chunk_size: usize,
    pub timing: Timing,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        let section = SupervisorSection::default();
        Self {
            slots: section.slots,
            max_buffer_size: section.max_buffer_size,
            read_chunk_size: section.read_chunk_size,
            timing: Timing::default(),
        }
    }
}

/// Timeouts and polling periods used by the collector and termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Upper bound on one collector wait.
    pub poll_interval: Duration,
    /// First polling window after SIGTERM.
    pub graceful_window: Duration,
    /// Total time allowed after SIGTERM before SIGKILL is sent.
    pub termination_timeout: Duration,
    /// Liveness polling period while waiting for a process to exit.
    pub termination_poll_interval: Duration,
    /// Wait after SIGKILL for the OS to reclaim the process.
    pub kill_settle: Duration,
    /// Delay before resetting a slot whose process had to be killed.
    pub reset_grace: Duration,
    /// Bounded wait when joining a collector.
    pub collector_join_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            graceful_window: Duration::from_secs(1),
            termination_timeout: Duration::from_secs(10),
            termination_poll_interval: Duration::from_millis(100),
            kill_settle: Duration::from_millis(200),
            reset_grace: Duration::from_millis(100),
            collector_join_timeout: Duration::from_secs(2),
        }
    }
}

impl Timing {
    /// Worst-case time a `terminate` call may block.
    pub fn termination_budget(&self) -> Duration {
        self.termination_timeout + self.kill_settle + self.collector_join_timeout + self.reset_grace
    }
}

/// Where the front end looks for runnable scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub dir: PathBuf,
    pub recursive: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let section = DiscoverySection::default();
        Self {
            dir: section.dir,
            recursive: section.recursive,
        }
    }
}
