use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment handed to every process the kernel starts.
///
/// - `vars`: variables visible to the REPL, scripts and shell commands.
/// - `current_dir`: working directory for child processes and the base for
///   relative file names given to `$newfile`.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process environment and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Inherit the process variables but run everything in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            current_dir: dir.into(),
            ..Self::new()
        }
    }

    /// Look up a variable, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Resolve `path` against `current_dir` unless it is absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Apply variables and working directory to a child process builder.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.current_dir);
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
        };

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let env = Environment::in_dir("/work");
        assert_eq!(env.resolve("notes.txt"), PathBuf::from("/work/notes.txt"));
        assert_eq!(env.resolve("/tmp/x.py"), PathBuf::from("/tmp/x.py"));
    }
}
