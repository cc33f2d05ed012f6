//! Commands the kernel answers in-process, without talking to the REPL.

use crate::command::{
    HELP_TOKEN, INSPECT_TOKEN, LOAD_TOKEN, NEWFILE_TOKEN, SHELL_MARKER, SHUTDOWN_TOKEN,
};
use crate::config::KernelConfig;
use crate::env::Environment;
use crate::error::{KernelError, Result};
use crate::magic::DIRECTIVE_MARKER;
use argh::{EarlyExit, FromArgs};
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// Text shown for `$help`.
pub fn help_text(config: &KernelConfig) -> String {
    let languages = config.language_names().join(", ");
    [
        format!("1. {SHELL_MARKER} : Run a shell command on the kernel host"),
        format!("2. {SHUTDOWN_TOKEN} : Shut down the kernel"),
        format!("3. {INSPECT_TOKEN} : Inspect the REPL to list all loaded functions"),
        format!("4. {LOAD_TOKEN} <tag> <file...> : Load files into the REPL so they can be called"),
        format!("5. {NEWFILE_TOKEN} <filename> : Create a file and append the lines below to it"),
        format!(
            "6. {DIRECTIVE_MARKER}lang : Run the cell as a one-shot script via a temporary file \
             (available languages: {languages})"
        ),
        format!("7. {HELP_TOKEN} : List all the commands and tags the kernel understands"),
    ]
    .join("\n")
}

/// Append the body of a `$newfile <filename>` cell to `<filename>`.
///
/// The first line names the file; everything after it, plus a trailing
/// newline, is appended. A cell with no body appends nothing. The file is
/// created when missing.
pub fn new_file(payload: &str, env: &Environment) -> Result<String> {
    let (first, body) = match payload.split_once('\n') {
        Some((first, content)) => (first, format!("{content}\n")),
        None => (payload, String::new()),
    };
    let name = first.strip_prefix(NEWFILE_TOKEN).unwrap_or(first).trim();
    if name.is_empty() {
        return Err(KernelError::MissingFileName);
    }

    let path = env.resolve(name);
    let write = || -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(body.as_bytes())
    };
    write().map_err(|source| KernelError::NewFile {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), bytes = body.len(), "appended cell to file");
    Ok(format!("File {name} is saved."))
}

#[derive(FromArgs, Debug, PartialEq)]
/// Load files into the REPL so their functions can be called from any cell.
pub struct Load {
    #[argh(positional)]
    /// loader tag understood by the runtime, e.g. py or node.
    pub tag: String,

    #[argh(positional, greedy)]
    /// files to load, in order.
    pub files: Vec<String>,
}

/// Validate the arguments of a `%load` payload.
///
/// On failure the returned string is the usage text to show instead.
pub fn parse_load(payload: &str) -> std::result::Result<Load, String> {
    let first = payload.lines().next().unwrap_or_default();
    let rest = first.strip_prefix(LOAD_TOKEN).unwrap_or(first);
    let args: Vec<&str> = rest.split_whitespace().collect();

    match Load::from_args(&[LOAD_TOKEN], &args) {
        Ok(load) if load.files.is_empty() => {
            Err(format!("{LOAD_TOKEN}: at least one file is required"))
        }
        Ok(load) => Ok(load),
        Err(EarlyExit { output, .. }) => Err(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_help_lists_every_token_and_language() {
        let text = help_text(&KernelConfig::default());
        for token in [
            HELP_TOKEN,
            SHELL_MARKER,
            INSPECT_TOKEN,
            LOAD_TOKEN,
            NEWFILE_TOKEN,
            SHUTDOWN_TOKEN,
        ] {
            assert!(text.contains(token), "help is missing {token}");
        }
        assert!(text.contains("javascript, python"));
        assert!(!text.contains("error"));
    }

    #[test]
    fn test_new_file_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env = Environment::in_dir(dir.path());

        let msg = new_file("$newfile notes.txt\nfirst line\nsecond line", &env)?;
        assert_eq!(msg, "File notes.txt is saved.");

        let written = fs::read_to_string(dir.path().join("notes.txt"))?;
        assert_eq!(written, "first line\nsecond line\n");
        Ok(())
    }

    #[test]
    fn test_new_file_appends() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env = Environment::in_dir(dir.path());

        new_file("$newfile log.txt\none", &env)?;
        new_file("$newfile log.txt\ntwo", &env)?;

        let written = fs::read_to_string(dir.path().join("log.txt"))?;
        assert_eq!(written, "one\ntwo\n");
        Ok(())
    }

    #[test]
    fn test_new_file_without_body_writes_nothing() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env = Environment::in_dir(dir.path());

        assert_eq!(new_file("$newfile empty.txt", &env)?, "File empty.txt is saved.");
        new_file("$newfile empty.txt", &env)?;

        let written = fs::read(dir.path().join("empty.txt"))?;
        assert!(written.is_empty(), "bodyless cell wrote {written:?}");
        Ok(())
    }

    #[test]
    fn test_new_file_with_blank_body_writes_one_newline() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env = Environment::in_dir(dir.path());

        new_file("$newfile blank.txt\n", &env)?;

        assert_eq!(fs::read_to_string(dir.path().join("blank.txt"))?, "\n");
        Ok(())
    }

    #[test]
    fn test_new_file_without_name() {
        let env = Environment::new();
        let err = new_file("$newfile   \nbody", &env).unwrap_err();
        assert!(matches!(err, KernelError::MissingFileName));
    }

    #[test]
    fn test_new_file_into_missing_dir_fails() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let env = Environment::in_dir(dir.path());

        let err = new_file("$newfile no/such/dir/a.txt\nx", &env).unwrap_err();
        assert!(matches!(err, KernelError::NewFile { .. }));
        Ok(())
    }

    #[test]
    fn test_parse_load() {
        let load = parse_load("%load py script.py lib.py").unwrap();
        assert_eq!(
            load,
            Load {
                tag: "py".to_string(),
                files: vec!["script.py".to_string(), "lib.py".to_string()],
            }
        );
    }

    #[test]
    fn test_parse_load_requires_files() {
        assert!(parse_load("%load").is_err());
        assert!(parse_load("%load py").is_err());
    }
}
