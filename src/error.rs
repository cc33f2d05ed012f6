//! Error types for the kernel.

use std::io;
use std::path::PathBuf;

/// Result alias used by every handler in this crate.
pub type Result<T> = std::result::Result<T, KernelError>;

/// Failures a single request can run into.
///
/// None of these end the session: the router turns them into error-styled
/// output and keeps serving requests.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The persistent REPL process could not be started.
    #[error("failed to start `{program}`: {source}")]
    ProcessSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// No live REPL process to talk to.
    #[error("the REPL process is not available")]
    ChannelUnavailable,

    /// Writing to or reading from the REPL process failed.
    #[error("REPL channel I/O error: {0}")]
    ChannelIo(#[from] io::Error),

    /// The REPL process closed its output before replying.
    #[error("the REPL process closed its output")]
    ChannelClosed,

    /// A reply from the REPL was not valid UTF-8.
    #[error("REPL reply is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// The inspect reply was not valid JSON.
    #[error("malformed inspect reply: {0}")]
    Inspect(#[from] serde_json::Error),

    /// A `$newfile` request could not be written.
    #[error("could not write {}: {source}", .path.display())]
    NewFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `$newfile` without a file name.
    #[error("usage: $newfile <filename>")]
    MissingFileName,

    /// The one-shot script could not be prepared or run.
    #[error("script execution failed: {0}")]
    Script(#[source] io::Error),

    /// A shell command could not be spawned.
    #[error("failed to run shell command `{command}`: {source}")]
    Shell {
        command: String,
        #[source]
        source: io::Error,
    },
}
