// tests/resource_leaks.rs

//! Runs alone in its own test binary so descriptor counts are not disturbed
//! by other tests spawning processes.

use slotrunner::{SlotStatus, Supervisor};

mod common;
use common::{ScriptDir, SOON, SupervisorConfigBuilder, TestResult, collectors_idle, init_tracing, wait_until};

#[cfg(target_os = "linux")]
#[tokio::test]
async fn repeated_cycles_do_not_leak_descriptors() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let quick = dir.shell("quick", "echo tick");
    let sleeper = dir.shell("sleeper", "exec sleep 5");
    let sup = Supervisor::new(SupervisorConfigBuilder::new().build())?;

    // One full cycle first: the runtime opens its SIGCHLD pipe on the
    // first spawn and keeps it for the life of the process.
    run_cycle(&sup, &quick, &sleeper).await;
    assert!(collectors_idle(&sup).await);
    let baseline = open_fds();

    for _ in 0..100 {
        run_cycle(&sup, &quick, &sleeper).await;
    }
    assert!(collectors_idle(&sup).await);

    let after = open_fds();
    assert_eq!(after, baseline, "descriptors grew from {baseline} to {after}");
    Ok(())
}

#[cfg(target_os = "linux")]
async fn run_cycle(sup: &Supervisor, quick: &std::path::Path, sleeper: &std::path::Path) {
    assert!(sup.start(quick, 0));
    assert!(sup.start(sleeper, 1));
    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Finished).await);
    sup.terminate(1).await;
    sup.cleanup_finished_processes().await;
    sup.new_output(0);
}

#[cfg(target_os = "linux")]
fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").map(|d| d.count()).unwrap_or(0)
}
