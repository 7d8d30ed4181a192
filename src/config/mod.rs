// src/config/mod.rs

//! Configuration loading and validation for slotrunner.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate sizing and timing invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default, parse_str};
pub use model::{
    ConfigFile, DiscoveryConfig, DiscoverySection, RawConfigFile, SupervisorConfig,
    SupervisorSection, Timing, TimingSection,
};
pub use validate::{MAX_TIMING, parse_duration, validate_supervisor_config};
