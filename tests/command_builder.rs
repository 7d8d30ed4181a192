// tests/command_builder.rs

use slotrunner::exec::{ScriptKind, build_command};

#[test]
fn python_scripts_run_through_python3() {
    assert_eq!(build_command("scripts/test.py"), "python3 \"scripts/test.py\"");
}

#[test]
fn interpreter_is_chosen_by_extension() {
    let cases = [
        ("a.sh", "bash \"a.sh\""),
        ("a.bash", "bash \"a.bash\""),
        ("a.js", "node \"a.js\""),
        ("a.rb", "ruby \"a.rb\""),
        ("a.pl", "perl \"a.pl\""),
    ];
    for (path, expected) in cases {
        assert_eq!(build_command(path), expected, "path {path}");
    }
}

#[test]
fn extension_match_ignores_case() {
    assert_eq!(ScriptKind::from_path("Report.PY"), ScriptKind::Python);
    assert_eq!(build_command("run.Sh"), "bash \"run.Sh\"");
}

#[test]
fn unknown_or_missing_extension_runs_the_file_directly() {
    assert_eq!(build_command("/opt/tools/deploy"), "\"/opt/tools/deploy\"");
    assert_eq!(build_command("notes.txt"), "\"notes.txt\"");
    assert_eq!(ScriptKind::from_path("notes.txt"), ScriptKind::Executable);
    assert_eq!(ScriptKind::Executable.interpreter(), None);
}

#[test]
fn paths_with_spaces_stay_one_argument() {
    assert_eq!(
        build_command("my scripts/nightly job.py"),
        "python3 \"my scripts/nightly job.py\""
    );
}

#[test]
fn shell_specials_inside_quotes_are_escaped() {
    assert_eq!(build_command("a$b.sh"), "bash \"a\\$b.sh\"");
    assert_eq!(build_command("say \"hi\".py"), "python3 \"say \\\"hi\\\".py\"");
    assert_eq!(build_command("x`y`"), "\"x\\`y\\`\"");
}

#[test]
fn script_kind_display_names() {
    assert_eq!(ScriptKind::Python.to_string(), "python");
    assert_eq!(ScriptKind::Shell.to_string(), "shell");
    assert_eq!(ScriptKind::Executable.to_string(), "executable");
}
