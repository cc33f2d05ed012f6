use crate::builtin::{help_text, new_file, parse_load};
use crate::channel::{ReplChannel, NOT_LOADED_MESSAGE};
use crate::command::{classify, CommandKind, ResponseSink};
use crate::config::KernelConfig;
use crate::env::Environment;
use crate::error::Result;
use crate::external::shell_execute;
use crate::magic::split_magics;
use crate::normalize::normalize;
use crate::script::run_script;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

pub const SHUTDOWN_MESSAGE: &str = "Kernel Shutdown!";

/// One cell to execute.
#[derive(Debug, Clone, Copy)]
pub struct ExecuteRequest<'a> {
    pub code: &'a str,
    /// Acknowledge the request without running it or producing output.
    pub silent: bool,
    /// Count this request towards the execution counter.
    pub store_history: bool,
}

impl<'a> ExecuteRequest<'a> {
    pub fn new(code: &'a str) -> Self {
        Self {
            code,
            silent: false,
            store_history: true,
        }
    }
}

/// Result record returned for every execute request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteReply {
    pub status: &'static str,
    pub execution_count: u32,
    pub payload: Vec<Value>,
    pub user_expressions: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownReply {
    pub restart: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteOutcome {
    pub reply: ExecuteReply,
    /// Set when the cell asked the kernel to stop; the host must not restart it.
    pub shutdown: Option<ShutdownReply>,
}

/// Text produced by a handler, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Captured {
    text: String,
    /// Style as an error even if the text never says "error".
    flagged: bool,
}

impl Captured {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flagged: false,
        }
    }

    fn flagged_if(text: impl Into<String>, flagged: bool) -> Self {
        Self {
            text: text.into(),
            flagged,
        }
    }
}

/// Routes cells to the REPL, one-shot scripts, the shell or local handlers.
///
/// The kernel owns its REPL channel outright and serves one request at a time.
///
/// Example
/// ```
/// use metacall_kernel::{ExecuteRequest, Kernel, KernelConfig, ReplChannel};
/// use metacall_kernel::env::Environment;
///
/// let mut kernel = Kernel::with_channel(
///     KernelConfig::default(),
///     Environment::new(),
///     ReplChannel::dead(),
/// );
/// let mut sink: Vec<String> = Vec::new();
/// kernel.execute(ExecuteRequest::new(">cobol\nDISPLAY 1"), &mut sink);
/// assert!(sink[0].starts_with("We don't suppport cobol language"));
/// ```
pub struct Kernel {
    config: KernelConfig,
    env: Environment,
    channel: ReplChannel,
    execution_count: u32,
}

impl Kernel {
    /// Create a kernel and start its REPL process.
    ///
    /// A REPL that fails to start is logged and leaves the kernel running
    /// without one; requests that need it report the channel as unavailable.
    pub fn start(config: KernelConfig, env: Environment) -> Self {
        let channel = if config.start_repl {
            match ReplChannel::spawn(&config, &env) {
                Ok(channel) => channel,
                Err(e) => {
                    error!(error = %e, "REPL subprocess failed to start");
                    ReplChannel::dead()
                }
            }
        } else {
            info!("starting without a REPL process");
            ReplChannel::dead()
        };
        Self::with_channel(config, env, channel)
    }

    /// Create a kernel around an existing channel.
    pub fn with_channel(config: KernelConfig, env: Environment, channel: ReplChannel) -> Self {
        Self {
            config,
            env,
            channel,
            execution_count: 0,
        }
    }

    pub fn execution_count(&self) -> u32 {
        self.execution_count
    }

    pub fn is_repl_alive(&self) -> bool {
        self.channel.is_alive()
    }

    /// Execute one cell, sending at most one message to `sink`.
    pub fn execute(
        &mut self,
        request: ExecuteRequest<'_>,
        sink: &mut dyn ResponseSink,
    ) -> ExecuteOutcome {
        if request.silent {
            debug!("silent request acknowledged without running");
            return self.outcome(None);
        }
        if request.store_history {
            self.execution_count += 1;
        }

        let cell = split_magics(request.code);
        let kind = classify(&cell);
        debug!(?kind, directives = ?cell.directives, "routing cell");

        let stopping = kind == CommandKind::Shutdown;
        let captured = self.run(kind, &cell.payload).unwrap_or_else(|e| {
            warn!(error = %e, "request failed");
            Captured::flagged_if(e.to_string(), true)
        });
        sink.respond(&normalize(&captured.text, captured.flagged));
        self.outcome(stopping.then_some(ShutdownReply { restart: false }))
    }

    /// Tear down the REPL and confirm the shutdown.
    ///
    /// Nothing is sent to the REPL. The kernel never asks to be restarted,
    /// whatever `restart` the host passed.
    pub fn shutdown(&mut self, restart: bool, sink: &mut dyn ResponseSink) -> ShutdownReply {
        info!(requested_restart = restart, "kernel shutting down");
        self.channel.teardown();
        sink.respond(SHUTDOWN_MESSAGE);
        ShutdownReply { restart: false }
    }

    fn run(&mut self, kind: CommandKind, payload: &str) -> Result<Captured> {
        match kind {
            CommandKind::Help => Ok(Captured::plain(help_text(&self.config))),
            CommandKind::ShellCommand => {
                let out = shell_execute(payload, &self.env)?;
                let failed = !out.success();
                Ok(Captured::flagged_if(out.text, failed))
            }
            CommandKind::Inspect => {
                let symbols = self
                    .channel
                    .inspect(&self.config.inspect_request, &self.config.inspect_terminator)?;
                Ok(Captured::plain(symbols.to_string()))
            }
            CommandKind::Load => match parse_load(payload) {
                Ok(load) => {
                    debug!(tag = %load.tag, files = ?load.files, "loading files");
                    Ok(Captured::plain(self.channel.load(payload)))
                }
                Err(usage) => Ok(Captured::plain(format!("{NOT_LOADED_MESSAGE}\n{usage}"))),
            },
            CommandKind::NewFile => Ok(Captured::plain(new_file(payload, &self.env)?)),
            CommandKind::Shutdown => {
                info!("kernel shutting down");
                self.channel.teardown();
                Ok(Captured::plain(SHUTDOWN_MESSAGE))
            }
            CommandKind::DirectiveExecute { tag } => {
                let Some(extension) = self.config.extension_for(&tag) else {
                    return Ok(Captured::plain(unsupported_language(&tag)));
                };
                let out = run_script(
                    payload,
                    extension,
                    &self.config.runtime,
                    self.config.framing,
                    &self.env,
                )?;
                let wrote_stderr = out.wrote_stderr;
                Ok(Captured::flagged_if(out.text, wrote_stderr))
            }
            CommandKind::ReplForward => Ok(Captured::plain(self.channel.forward(payload)?)),
        }
    }

    fn outcome(&self, shutdown: Option<ShutdownReply>) -> ExecuteOutcome {
        ExecuteOutcome {
            reply: ExecuteReply {
                status: "ok",
                execution_count: self.execution_count,
                payload: Vec::new(),
                user_expressions: Map::new(),
            },
            shutdown,
        }
    }
}

fn unsupported_language(tag: &str) -> String {
    format!(
        "We don't suppport {tag} language, yet.\n\
         Please try another language or add support for {tag} language.\n"
    )
}
