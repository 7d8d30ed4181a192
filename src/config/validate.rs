// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{
    ConfigFile, DiscoveryConfig, RawConfigFile, SupervisorConfig, Timing, TimingSection,
};
use crate::errors::{Result, SlotrunnerError};

/// Upper bound for every `[timing]` value.
pub const MAX_TIMING: Duration = Duration::from_secs(24 * 60 * 60);

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SlotrunnerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let timing = parse_timing(&raw.timing)?;

        let supervisor = SupervisorConfig {
            slots: raw.supervisor.slots,
            max_buffer_size: raw.supervisor.max_buffer_size,
            read_chunk_size: raw.supervisor.read_chunk_size,
            timing,
        };
        validate_supervisor_config(&supervisor)?;

        Ok(ConfigFile {
            supervisor,
            discovery: DiscoveryConfig {
                dir: raw.discovery.dir,
                recursive: raw.discovery.recursive,
            },
        })
    }
}

/// Check the invariants the supervisor relies on.
///
/// Also used for configs built in code rather than loaded from TOML.
pub fn validate_supervisor_config(cfg: &SupervisorConfig) -> Result<()> {
    if cfg.slots == 0 {
        return Err(config_err("[supervisor].slots must be >= 1 (got 0)"));
    }
    if cfg.max_buffer_size == 0 {
        return Err(config_err("[supervisor].max_buffer_size must be >= 1 (got 0)"));
    }
    if cfg.read_chunk_size == 0 {
        return Err(config_err("[supervisor].read_chunk_size must be >= 1 (got 0)"));
    }

    let t = &cfg.timing;
    let bounded = [
        ("poll_interval", t.poll_interval),
        ("graceful_window", t.graceful_window),
        ("termination_timeout", t.termination_timeout),
        ("termination_poll_interval", t.termination_poll_interval),
        ("kill_settle", t.kill_settle),
        ("reset_grace", t.reset_grace),
        ("collector_join_timeout", t.collector_join_timeout),
    ];
    for (name, value) in bounded {
        if value > MAX_TIMING {
            return Err(SlotrunnerError::ConfigError(format!(
                "[timing].{name} ({value:?}) must not exceed {MAX_TIMING:?}"
            )));
        }
    }

    if t.poll_interval.is_zero() {
        return Err(config_err("[timing].poll_interval must be greater than zero"));
    }
    if t.termination_poll_interval.is_zero() {
        return Err(config_err(
            "[timing].termination_poll_interval must be greater than zero",
        ));
    }
    if t.termination_timeout < t.graceful_window {
        return Err(SlotrunnerError::ConfigError(format!(
            "[timing].termination_timeout ({:?}) must not be shorter than graceful_window ({:?})",
            t.termination_timeout, t.graceful_window
        )));
    }

    Ok(())
}

fn parse_timing(section: &TimingSection) -> Result<Timing> {
    let defaults = Timing::default();

    let field = |name: &str, value: &Option<String>, default: Duration| -> Result<Duration> {
        match value {
            None => Ok(default),
            Some(s) => parse_duration(s).map_err(|e| {
                SlotrunnerError::ConfigError(format!("[timing].{name} = {s:?}: {e}"))
            }),
        }
    };

    Ok(Timing {
        poll_interval: field("poll_interval", &section.poll_interval, defaults.poll_interval)?,
        graceful_window: field(
            "graceful_window",
            &section.graceful_window,
            defaults.graceful_window,
        )?,
        termination_timeout: field(
            "termination_timeout",
            &section.termination_timeout,
            defaults.termination_timeout,
        )?,
        termination_poll_interval: field(
            "termination_poll_interval",
            &section.termination_poll_interval,
            defaults.termination_poll_interval,
        )?,
        kill_settle: field("kill_settle", &section.kill_settle, defaults.kill_settle)?,
        reset_grace: field("reset_grace", &section.reset_grace, defaults.reset_grace)?,
        collector_join_timeout: field(
            "collector_join_timeout",
            &section.collector_join_timeout,
            defaults.collector_join_timeout,
        )?,
    })
}

fn config_err(msg: &str) -> SlotrunnerError {
    SlotrunnerError::ConfigError(msg.to_string())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{}'", s))
}
