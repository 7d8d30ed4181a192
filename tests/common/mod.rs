// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

use std::sync::Arc;
use std::time::Duration;

pub use slotrunner_test_utils::builders::{ScriptDir, SupervisorConfigBuilder};
pub use slotrunner_test_utils::fake_process::{FakeBehaviour, FakeControl, FakeProcessBackend};
pub use slotrunner_test_utils::{init_tracing, wait_until, with_timeout};

use slotrunner::Supervisor;
use slotrunner::config::SupervisorConfig;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Generous bound for anything that should happen "soon".
pub const SOON: Duration = Duration::from_secs(5);

/// Supervisor over a fresh fake backend.
pub fn fake_supervisor(config: SupervisorConfig) -> (Supervisor, Arc<FakeProcessBackend>) {
    let backend = Arc::new(FakeProcessBackend::new());
    let supervisor = Supervisor::with_backend(config, backend.clone())
        .expect("test config should be valid");
    (supervisor, backend)
}

/// Wait until no collector task is alive, so every byte read has been stored.
pub async fn collectors_idle(supervisor: &Supervisor) -> bool {
    wait_until(SOON, || supervisor.active_collectors() == 0).await
}
