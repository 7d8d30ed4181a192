use proptest::prelude::*;
use slotrunner::exec::build_command;

/// Undo `build_command`'s double-quote escaping.
fn unquote(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '"' | '$' | '`' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}

proptest! {
    #[test]
    fn python_paths_get_interpreter_and_round_trip_quoting(stem in "[ a-zA-Z0-9_$`\"\\\\-]{1,24}") {
        let path = format!("{stem}.py");
        let cmd = build_command(&path);

        let quoted = cmd.strip_prefix("python3 ");
        prop_assert!(quoted.is_some(), "missing interpreter: {}", cmd);
        prop_assert_eq!(unquote(quoted.unwrap_or_default()), Some(path));
    }

    #[test]
    fn unknown_extensions_are_quoted_only(name in "[a-z]{1,10}(\\.(txt|bin|exe))?") {
        let cmd = build_command(&name);
        prop_assert_eq!(cmd, format!("\"{name}\""));
    }
}
