// src/exec/command.rs

//! Script path -> shell command line.

use std::fmt;
use std::path::Path;

/// What kind of program a path points at, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Python,
    Shell,
    JavaScript,
    Ruby,
    Perl,
    /// No recognised extension: run the file itself.
    Executable,
}

impl ScriptKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("py") => ScriptKind::Python,
            Some("sh") | Some("bash") => ScriptKind::Shell,
            Some("js") => ScriptKind::JavaScript,
            Some("rb") => ScriptKind::Ruby,
            Some("pl") => ScriptKind::Perl,
            _ => ScriptKind::Executable,
        }
    }

    /// Interpreter used to run this kind, if any.
    pub fn interpreter(self) -> Option<&'static str> {
        match self {
            ScriptKind::Python => Some("python3"),
            ScriptKind::Shell => Some("bash"),
            ScriptKind::JavaScript => Some("node"),
            ScriptKind::Ruby => Some("ruby"),
            ScriptKind::Perl => Some("perl"),
            ScriptKind::Executable => None,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScriptKind::Python => "python",
            ScriptKind::Shell => "shell",
            ScriptKind::JavaScript => "javascript",
            ScriptKind::Ruby => "ruby",
            ScriptKind::Perl => "perl",
            ScriptKind::Executable => "executable",
        };
        f.write_str(s)
    }
}

/// Build the `sh -c` command line that runs `path`.
///
/// Interpreted scripts are prefixed with their interpreter; anything else is
/// executed directly. The path is always double-quoted so embedded spaces
/// survive the shell.
///
/// ```
/// use slotrunner::exec::build_command;
///
/// assert_eq!(build_command("jobs/report.py"), "python3 \"jobs/report.py\"");
/// assert_eq!(build_command("bin/tool"), "\"bin/tool\"");
/// ```
pub fn build_command(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let quoted = quote_path(&path.to_string_lossy());

    match ScriptKind::from_path(path).interpreter() {
        Some(interpreter) => format!("{interpreter} {quoted}"),
        None => quoted,
    }
}

/// Double-quote a path for `sh`, escaping the characters that stay special
/// inside double quotes.
fn quote_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
