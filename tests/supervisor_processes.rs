// tests/supervisor_processes.rs

//! End-to-end runs against real `sh`/`bash` processes.

use std::time::Duration;

use slotrunner::exec::TerminationOutcome;
use slotrunner::{SlotStatus, Supervisor};

mod common;
use common::{ScriptDir, SOON, SupervisorConfigBuilder, TestResult, collectors_idle, init_tracing, wait_until};

fn real_supervisor(builder: SupervisorConfigBuilder) -> Supervisor {
    Supervisor::new(builder.build()).expect("test config should be valid")
}

#[tokio::test]
async fn echo_script_finishes_with_output_and_banner() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("hello", "echo hello");
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    assert!(sup.start(&script, 0));
    assert!(sup.pid(0).is_some());
    assert!(sup.command(0).starts_with("bash \""));

    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Finished).await);
    assert!(collectors_idle(&sup).await);
    assert_eq!(sup.exit_code(0), Some(0));
    assert!(sup.new_output(0).contains("hello"));

    assert_eq!(sup.cleanup_finished_processes().await, 1);
    assert_eq!(sup.status(0), SlotStatus::Idle);
    assert!(sup.new_output(0).contains("Process completed successfully"));
    Ok(())
}

#[tokio::test]
async fn failing_script_reports_its_exit_code() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("fail", "echo oops >&2\nexit 1");
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    assert!(sup.start(&script, 1));
    assert!(wait_until(SOON, || !sup.is_running(1)).await);

    assert_eq!(sup.status(1), SlotStatus::Error);
    assert_eq!(sup.exit_code(1), Some(1));
    assert!(collectors_idle(&sup).await);
    assert!(sup.new_output(1).contains("oops"));
    Ok(())
}

#[tokio::test]
async fn missing_interpreter_target_fails_inside_the_shell() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    // The shell starts fine; the exec'd command is what fails.
    assert!(sup.start(dir.path().join("does-not-exist"), 0));
    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Error).await);
    assert_eq!(sup.exit_code(0), Some(127));
    Ok(())
}

#[tokio::test]
async fn sleeping_script_is_terminated_gracefully() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("sleeper", "exec sleep 5");
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    assert!(sup.start(&script, 0));
    assert!(sup.is_running(0));
    let pid = sup.pid(0).expect("running slot has a pid");

    let outcome = sup.terminate(0).await;

    assert_eq!(outcome, TerminationOutcome::Graceful);
    assert_eq!(sup.status(0), SlotStatus::Idle);
    assert_eq!(sup.pid(0), None);
    assert!(!process_exists(pid), "pid {pid} still alive");
    assert_eq!(sup.active_collectors(), 0);
    Ok(())
}

#[tokio::test]
async fn script_ignoring_sigterm_is_killed_within_budget() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("stubborn", "trap '' TERM\nwhile true; do sleep 0.05; done");
    let config = SupervisorConfigBuilder::new()
        .graceful_window(Duration::from_millis(100))
        .termination_timeout(Duration::from_millis(400))
        .build();
    let budget = config.timing.termination_budget();
    let sup = Supervisor::new(config)?;

    assert!(sup.start(&script, 0));
    // Give bash time to install the trap.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let pid = sup.pid(0).expect("running slot has a pid");

    let started = tokio::time::Instant::now();
    let outcome = sup.terminate(0).await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, TerminationOutcome::Killed);
    assert!(elapsed >= Duration::from_millis(400), "killed too early: {elapsed:?}");
    assert!(elapsed <= budget + Duration::from_secs(1), "took {elapsed:?}");
    assert!(!process_exists(pid));
    assert_eq!(sup.status(0), SlotStatus::Idle);
    Ok(())
}

#[tokio::test]
async fn chatty_script_output_stays_bounded() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("chatty", "i=0\nwhile [ $i -lt 2000 ]; do echo \"line $i\"; i=$((i+1)); done");
    let sup = real_supervisor(
        SupervisorConfigBuilder::new()
            .max_buffer_size(5)
            .read_chunk_size(256)
            .poll_interval(Duration::from_millis(100)),
    );

    assert!(sup.start(&script, 0));
    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Finished).await);
    assert!(collectors_idle(&sup).await);

    assert!(sup.buffered_chunks(0) <= 5);
    let tail = sup.new_output(0);
    assert!(tail.ends_with("line 1999\n"), "got {tail:?}");
    assert!(!tail.contains("line 0\n"));
    Ok(())
}

#[tokio::test]
async fn slots_run_concurrently() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let slow = dir.shell("slow", "sleep 0.5\necho slow done");
    let fast = dir.shell("fast", "echo fast done");
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    let started = tokio::time::Instant::now();
    assert!(sup.start(&slow, 0));
    assert!(sup.start(&fast, 1));

    assert!(wait_until(SOON, || sup.status(1) == SlotStatus::Finished).await);
    assert!(sup.is_running(0), "slow script should still be running");

    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Finished).await);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(collectors_idle(&sup).await);
    assert!(sup.new_output(0).contains("slow done"));
    assert!(sup.new_output(1).contains("fast done"));
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn drop_kills_helpers_left_behind_by_a_finished_script() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let script = dir.shell("spawner", "sleep 30 >/dev/null 2>&1 &\necho helper=$!");
    let sup = real_supervisor(SupervisorConfigBuilder::new());

    assert!(sup.start(&script, 0));
    assert!(wait_until(SOON, || sup.status(0) == SlotStatus::Finished).await);
    let output = sup.new_output(0);
    let helper: u32 = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("helper="))
        .and_then(|p| p.trim().parse().ok())
        .expect("script should print the helper pid");
    assert!(process_running(helper));

    drop(sup);

    assert!(
        wait_until(SOON, || !process_running(helper)).await,
        "helper {helper} survived the supervisor"
    );
    Ok(())
}

/// A killed helper is reparented and may sit as a zombie until its new
/// parent reaps it; that counts as gone.
#[cfg(target_os = "linux")]
fn process_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

fn process_exists(pid: u32) -> bool {
    let Ok(pid) = i32::try_from(pid) else {
        return false;
    };
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid), None).is_ok()
}
