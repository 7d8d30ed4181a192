// tests/cli_entry.rs

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use slotrunner::cli::{CliArgs, LogLevel};
use slotrunner::run;
use tempfile::NamedTempFile;

mod common;
use common::{ScriptDir, TestResult, init_tracing, with_timeout};

#[test]
fn parses_flags_and_scripts() -> TestResult {
    let args = CliArgs::try_parse_from([
        "slotrunner",
        "--slots",
        "3",
        "--log-level",
        "debug",
        "--dry-run",
        "a.py",
        "b.sh",
    ])?;

    assert_eq!(args.slots, Some(3));
    assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    assert!(args.dry_run);
    assert!(!args.list);
    assert_eq!(args.scripts, vec![PathBuf::from("a.py"), PathBuf::from("b.sh")]);
    Ok(())
}

#[test]
fn zero_slots_is_rejected_by_the_parser() {
    assert!(CliArgs::try_parse_from(["slotrunner", "--slots", "0"]).is_err());
}

#[tokio::test]
async fn runs_given_scripts_and_reports_failure() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    let good = dir.shell("good", "echo fine");
    let bad = dir.shell("bad", "exit 2");
    let args = CliArgs::try_parse_from([
        PathBuf::from("slotrunner"),
        PathBuf::from("--dir"),
        dir.path().to_path_buf(),
        good,
        bad,
    ])?;

    let code = with_timeout(run(args)).await?;
    assert_eq!(code, 1);
    Ok(())
}

#[tokio::test]
async fn discovers_scripts_when_none_are_given() -> TestResult {
    init_tracing();
    let dir = ScriptDir::new();
    dir.shell("one", "echo 1");
    dir.shell("two", "echo 2");
    dir.plain("README", "not runnable");

    let mut config = NamedTempFile::new()?;
    write!(
        config,
        "[supervisor]\nslots = 1\n\n[timing]\npoll_interval = \"10ms\"\n\n[discovery]\ndir = {:?}\n",
        dir.path().display().to_string()
    )?;

    let args = CliArgs::try_parse_from([
        PathBuf::from("slotrunner"),
        PathBuf::from("--config"),
        config.path().to_path_buf(),
    ])?;

    let code = with_timeout(run(args)).await?;
    assert_eq!(code, 0);
    Ok(())
}

#[tokio::test]
async fn missing_explicit_config_is_an_error() -> TestResult {
    let dir = ScriptDir::new();
    let args = CliArgs::try_parse_from([
        PathBuf::from("slotrunner"),
        PathBuf::from("--config"),
        dir.path().join("absent.toml"),
    ])?;

    assert!(run(args).await.is_err());
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    let dir = ScriptDir::new();
    let marker = dir.path().join("ran");
    let script = dir.shell("touch", &format!("touch {:?}", marker.display().to_string()));

    let args = CliArgs::try_parse_from([
        PathBuf::from("slotrunner"),
        PathBuf::from("--dry-run"),
        script,
    ])?;

    assert_eq!(run(args).await?, 0);
    assert!(!marker.exists());
    Ok(())
}
