use crate::magic::ParsedCell;

/// Prints the list of supported commands.
pub const HELP_TOKEN: &str = "$help";
/// Runs the rest of the payload as a shell command.
pub const SHELL_MARKER: &str = "!";
/// Lists the symbols loaded in the REPL.
pub const INSPECT_TOKEN: &str = "%inspect";
/// Loads files into the REPL: `%load <tag> <file...>`.
pub const LOAD_TOKEN: &str = "%load";
/// Appends the cell body to a file: `$newfile <filename>`.
pub const NEWFILE_TOKEN: &str = "$newfile";
/// Stops the kernel.
pub const SHUTDOWN_TOKEN: &str = "$shutdown";

/// What a cell asks the kernel to do.
///
/// Produced by [`classify`]; exactly one kind per cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    ShellCommand,
    Inspect,
    Load,
    NewFile,
    Shutdown,
    /// Run the payload as a one-shot script in the language named by `tag`.
    DirectiveExecute { tag: String },
    /// Send the payload to the persistent REPL.
    ReplForward,
}

/// Pick the command kind for a parsed cell.
///
/// Token prefixes are checked in a fixed order and the first match wins, so a
/// payload such as `$help!` is always `Help`. Directives only matter when no
/// token matches, and only the first one is used.
pub fn classify(cell: &ParsedCell) -> CommandKind {
    let payload = cell.payload.as_str();
    let prefixed = [
        (HELP_TOKEN, CommandKind::Help),
        (SHELL_MARKER, CommandKind::ShellCommand),
        (INSPECT_TOKEN, CommandKind::Inspect),
        (LOAD_TOKEN, CommandKind::Load),
        (NEWFILE_TOKEN, CommandKind::NewFile),
        (SHUTDOWN_TOKEN, CommandKind::Shutdown),
    ];
    for (token, kind) in prefixed {
        if payload.starts_with(token) {
            return kind;
        }
    }

    match cell.directives.first() {
        Some(tag) => CommandKind::DirectiveExecute {
            tag: tag.trim().to_lowercase(),
        },
        None => CommandKind::ReplForward,
    }
}

/// Destination for the text a request produces.
///
/// The kernel calls [`ResponseSink::respond`] at most once per request.
pub trait ResponseSink {
    fn respond(&mut self, text: &str);
}

impl ResponseSink for Vec<String> {
    fn respond(&mut self, text: &str) {
        self.push(text.to_string());
    }
}
