//! Helpers for processes the kernel starts outside the REPL.

use crate::command::SHELL_MARKER;
use crate::env::Environment;
use crate::error::{KernelError, Result};
use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Conventional process exit code; 0 means success.
pub type ExitCode = i32;

/// Output of a finished shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Standard output and standard error, interleaved.
    pub text: String,
    pub code: ExitCode,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run the text after the shell marker through the platform shell.
///
/// The command inherits `env`, runs with shell interpretation enabled and has
/// its standard error folded into standard output.
pub fn shell_execute(payload: &str, env: &Environment) -> Result<ShellOutput> {
    let command = payload
        .strip_prefix(SHELL_MARKER)
        .unwrap_or(payload)
        .trim_start();

    let mut cmd = shell_command(command);
    env.apply(&mut cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let output = cmd.output().map_err(|source| KernelError::Shell {
        command: command.to_string(),
        source,
    })?;
    let code = exit_code(output.status);
    debug!(command, code, "shell command finished");

    Ok(ShellOutput {
        text: String::from_utf8_lossy(&output.stdout).into_owned(),
        code,
    })
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(format!("exec 2>&1\n{command}"));
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(format!("({command}) 2>&1"));
    cmd
}

/// Exit code of a finished process, mapping signals the way shells do.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve the runtime executable against the environment's `PATH`.
///
/// Falls back to the bare name so that spawning reports the real error.
pub fn resolve_program(program: &str, env: &Environment) -> PathBuf {
    let search_paths = env.get_var("PATH").unwrap_or_default();
    find_command_path(OsStr::new(&search_paths), Path::new(program))
        .map(Cow::into_owned)
        .unwrap_or_else(|| PathBuf::from(program))
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./foo` on Unix, or any relative path elsewhere: returned if it exists.
/// - Single component: the first match in `search_paths`.
/// - Several components: returned if it exists relative to the current dir.
/// - Empty path: `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, None) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| path.exists())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    #[test]
    #[cfg(unix)]
    fn test_shell_captures_stdout_and_stderr() -> anyhow::Result<()> {
        let env = Environment::new();
        let out = shell_execute("! echo out; echo err 1>&2", &env)?;
        assert!(out.success());
        assert_eq!(out.text, "out\nerr\n");
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_shell_reports_failure_code() -> anyhow::Result<()> {
        let env = Environment::new();
        let out = shell_execute("!exit 3", &env)?;
        assert_eq!(out.code, 3);
        assert!(!out.success());
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_shell_runs_in_environment_dir() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut env = Environment::in_dir(dir.path());
        env.set_var("KERNEL_TEST_GREETING", "hi there");

        let out = shell_execute("!pwd; echo $KERNEL_TEST_GREETING", &env)?;
        let canonical = dir.path().canonicalize()?;
        let mut lines = out.text.lines();
        assert_eq!(lines.next().map(Path::new), Some(canonical.as_path()));
        assert_eq!(lines.next(), Some("hi there"));
        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let found = find_command_path(osstr("/bin"), path).expect("Expected to find /bin/sh");
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let found = find_command_path(osstr("/nonexistent:/bin"), Path::new("sh"))
            .expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found.as_ref(), Path::new("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("nonexisting"));
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    fn empty_path_is_none() {
        let res = find_command_path(OsStr::new("/bin"), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }

    #[test]
    fn test_resolve_program_falls_back_to_name() {
        let env = Environment::new();
        assert_eq!(
            resolve_program("surely-not-installed-runtime", &env),
            PathBuf::from("surely-not-installed-runtime")
        );
    }
}
