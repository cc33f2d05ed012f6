//! One-shot script execution through a temporary file.

use crate::config::OutputFraming;
use crate::env::Environment;
use crate::error::{KernelError, Result};
use crate::external::{exit_code, resolve_program, ExitCode};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Captured result of a script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Standard output followed by standard error, one line per line.
    pub text: String,
    /// Whether the script wrote anything to standard error.
    pub wrote_stderr: bool,
    pub code: ExitCode,
}

/// Write `payload` to a temporary `*.extension` file and run `runtime <file>`.
///
/// The temporary file is removed when this function returns, whichever way it
/// returns. A failing script is not an error here: its exit code and output
/// are simply reported back.
pub fn run_script(
    payload: &str,
    extension: &str,
    runtime: &str,
    framing: OutputFraming,
    env: &Environment,
) -> Result<ScriptOutput> {
    let mut file = tempfile::Builder::new()
        .prefix("kernel-cell-")
        .suffix(extension)
        .tempfile()
        .map_err(KernelError::Script)?;
    file.write_all(payload.as_bytes())
        .and_then(|()| file.flush())
        .map_err(KernelError::Script)?;
    // Close our handle so the runtime can open the file on every platform;
    // the path guard still deletes it on drop.
    let script = file.into_temp_path();

    let mut cmd = Command::new(resolve_program(runtime, env));
    cmd.arg(&*script);
    env.apply(&mut cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = cmd.output().map_err(KernelError::Script)?;
    let code = exit_code(output.status);
    debug!(script = %script.display(), code, "script finished");

    Ok(ScriptOutput {
        text: render_output(&output.stdout, &output.stderr, framing),
        wrote_stderr: !output.stderr.is_empty(),
        code,
    })
}

/// Render captured streams as display text.
///
/// Each stream is turned into its escaped `b'...'` form, unwrapped using
/// `framing`, and the two are joined with an escaped newline. The result is
/// then split on escaped newlines, every piece ending with a real newline.
pub fn render_output(stdout: &[u8], stderr: &[u8], framing: OutputFraming) -> String {
    let joined = [
        unwrap_framing(&raw_repr(stdout), framing),
        unwrap_framing(&raw_repr(stderr), framing),
    ]
    .join("\\n");

    let mut text = String::with_capacity(joined.len());
    for line in split_escaped_lines(&joined) {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

/// Escaped representation of raw bytes, e.g. `b'1\n'` for `"1\n"`.
pub fn raw_repr(bytes: &[u8]) -> String {
    let mut out = String::from("b'");
    for c in String::from_utf8_lossy(bytes).chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn unwrap_framing(repr: &str, framing: OutputFraming) -> &str {
    let end = repr.len().saturating_sub(framing.trailing);
    repr.get(framing.leading..end).unwrap_or_default()
}

/// Split escaped text on `\n` sequences, unescaping everything else.
fn split_escaped_lines(escaped: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            line.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => lines.push(std::mem::take(&mut line)),
            Some('r') => line.push('\r'),
            Some('t') => line.push('\t'),
            Some('\\') => line.push('\\'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => line.push(decoded),
                    None => {
                        line.push_str("\\x");
                        line.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                line.push('\\');
                line.push(other);
            }
            None => line.push('\\'),
        }
    }
    lines.push(line);
    lines
}
