// tests/runner.rs

use std::time::Duration;

use slotrunner::Supervisor;
use slotrunner::runner::{RunSummary, run_scripts, write_prefixed};

mod common;
use common::{ScriptDir, SupervisorConfigBuilder, TestResult, init_tracing, with_timeout};

const TICK: Duration = Duration::from_millis(20);

#[test]
fn prefixes_every_line_across_chunk_boundaries() -> TestResult {
    let mut out = Vec::new();
    let mut at_line_start = true;

    write_prefixed(&mut out, "[slot 0] ", "first\nsec", &mut at_line_start)?;
    assert!(!at_line_start);
    write_prefixed(&mut out, "[slot 0] ", "ond\nthird\n", &mut at_line_start)?;
    assert!(at_line_start);

    assert_eq!(
        String::from_utf8(out)?,
        "[slot 0] first\n[slot 0] second\n[slot 0] third\n"
    );
    Ok(())
}

#[test]
fn summary_exit_codes() {
    let mut summary = RunSummary::default();
    assert!(summary.all_succeeded());
    assert_eq!(summary.exit_code(), 0);

    summary.failed.push("bad.sh".into());
    assert_eq!(summary.exit_code(), 1);

    summary.interrupted = true;
    assert_eq!(summary.exit_code(), 130);
    assert!(!summary.all_succeeded());
}

#[tokio::test]
async fn queue_is_drained_through_limited_slots() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let ok_a = dir.shell("a", "echo alpha");
    let bad = dir.shell("b", "echo beta\nexit 3");
    let ok_c = dir.shell("c", "echo gamma");
    let sup = Supervisor::new(SupervisorConfigBuilder::new().slots(2).build())?;

    let mut out = Vec::new();
    let summary = with_timeout(run_scripts(
        &sup,
        vec![ok_a.clone(), bad.clone(), ok_c.clone()],
        &mut out,
        TICK,
        std::future::pending(),
    ))
    .await?;

    let mut succeeded = summary.succeeded.clone();
    succeeded.sort();
    assert_eq!(succeeded, vec![ok_a, ok_c]);
    assert_eq!(summary.failed, vec![bad]);
    assert!(summary.skipped.is_empty());
    assert!(!summary.interrupted);
    assert_eq!(summary.exit_code(), 1);

    let text = String::from_utf8(out)?;
    for word in ["alpha", "beta", "gamma"] {
        assert!(text.contains(word), "missing {word} in {text:?}");
    }
    assert!(text.contains("] Process completed successfully"));
    assert!(text.contains("] Process completed with exit code 3"));
    for line in text.lines() {
        assert!(line.starts_with("[slot "), "unprefixed line {line:?}");
    }

    assert_eq!(sup.active_collectors(), 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_terminates_running_and_skips_queued() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let long = dir.shell("long", "echo started\nexec sleep 30");
    let queued = dir.shell("queued", "echo never");
    let sup = Supervisor::new(SupervisorConfigBuilder::new().slots(1).build())?;

    let mut out = Vec::new();
    let summary = with_timeout(run_scripts(
        &sup,
        vec![long.clone(), queued.clone()],
        &mut out,
        TICK,
        tokio::time::sleep(Duration::from_millis(300)),
    ))
    .await?;

    assert!(summary.interrupted);
    assert_eq!(summary.failed, vec![long]);
    assert_eq!(summary.skipped, vec![queued]);
    assert_eq!(summary.exit_code(), 130);
    assert_eq!(sup.status(0), slotrunner::SlotStatus::Idle);

    let text = String::from_utf8(out)?;
    assert!(!text.contains("never"));
    Ok(())
}

#[tokio::test]
async fn empty_queue_returns_immediately() -> TestResult {
    init_tracing();
    let sup = Supervisor::new(SupervisorConfigBuilder::new().build())?;
    let mut out = Vec::new();

    let summary = with_timeout(run_scripts(&sup, Vec::new(), &mut out, TICK, std::future::pending())).await?;

    assert_eq!(summary, RunSummary::default());
    assert!(out.is_empty());
    Ok(())
}
