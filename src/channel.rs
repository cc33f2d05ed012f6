//! Line-based request/response channel to the persistent REPL process.
//!
//! Every request is a single line. A plain request gets exactly one line
//! back; an inspect request gets a JSON block ended by a lone newline. There
//! is no other framing, so a request that makes the runtime print several
//! lines leaves the extra lines to be read as the reply to the next request.

use crate::config::KernelConfig;
use crate::env::Environment;
use crate::error::{KernelError, Result};
use crate::external::resolve_program;
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

pub const LOADED_MESSAGE: &str = "The file has been successfully loaded";
pub const NOT_LOADED_MESSAGE: &str = "The file was not loaded onto the Kernel";

struct Streams {
    writer: Box<dyn Write>,
    reader: Box<dyn BufRead>,
}

/// Connection to the persistent REPL.
///
/// Once an I/O failure or end of stream is seen the channel is dead and every
/// later request fails with [`KernelError::ChannelUnavailable`].
pub struct ReplChannel {
    streams: Option<Streams>,
    child: Option<Child>,
}

impl ReplChannel {
    /// Start `<runtime> <repl_script>` and swallow its greeting.
    pub fn spawn(config: &KernelConfig, env: &Environment) -> Result<Self> {
        let program = resolve_program(&config.runtime, env);
        let mut cmd = Command::new(&program);
        cmd.arg(&config.repl_script);
        env.apply(&mut cmd);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_error = |source: io::Error| KernelError::ProcessSpawn {
            program: config.runtime.clone(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(spawn_error(io::Error::other("child pipes were not created")));
        };
        info!(program = %program.display(), pid = child.id(), "REPL process started");

        let mut channel = Self {
            streams: Some(Streams {
                writer: Box::new(stdin),
                reader: Box::new(BufReader::new(stdout)),
            }),
            child: Some(child),
        };
        channel
            .discard_greeting(config.greeting_lines)
            .map_err(|e| spawn_error(io::Error::other(e.to_string())))?;
        Ok(channel)
    }

    /// Channel over arbitrary streams, with no process attached.
    pub fn from_streams(writer: impl Write + 'static, reader: impl BufRead + 'static) -> Self {
        Self {
            streams: Some(Streams {
                writer: Box::new(writer),
                reader: Box::new(reader),
            }),
            child: None,
        }
    }

    /// A channel that was never connected.
    pub fn dead() -> Self {
        Self {
            streams: None,
            child: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.streams.is_some()
    }

    /// Read and drop `lines` lines.
    pub fn discard_greeting(&mut self, lines: usize) -> Result<()> {
        for _ in 0..lines {
            let greeting = self.read_line()?;
            debug!(greeting = greeting.trim_end(), "discarded REPL greeting");
        }
        Ok(())
    }

    /// Send one line and return the one line that comes back.
    pub fn forward(&mut self, payload: &str) -> Result<String> {
        self.send(payload)?;
        self.read_line()
    }

    /// Ask the REPL for its loaded symbols.
    ///
    /// Lines are collected until one equals `terminator`; the whole block,
    /// terminator included, must parse as JSON.
    pub fn inspect(&mut self, request: &str, terminator: &str) -> Result<Value> {
        self.send(request)?;
        let mut reply = String::new();
        loop {
            let line = self.read_line()?;
            reply.push_str(&line);
            if line == terminator {
                break;
            }
        }
        Ok(serde_json::from_str(&reply)?)
    }

    /// Forward a `%load` request; failures turn into the "not loaded" message.
    pub fn load(&mut self, payload: &str) -> String {
        match self.forward(payload) {
            Ok(reply) => {
                debug!(reply = reply.trim_end(), "load acknowledged");
                LOADED_MESSAGE.to_string()
            }
            Err(e) => {
                warn!(error = %e, "load failed");
                NOT_LOADED_MESSAGE.to_string()
            }
        }
    }

    /// Close the pipes and stop the process. Nothing is sent to it first.
    pub fn teardown(&mut self) {
        self.streams = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "REPL process already exited");
            }
            match child.wait() {
                Ok(status) => info!(%status, "REPL process stopped"),
                Err(e) => warn!(error = %e, "failed to reap REPL process"),
            }
        }
    }

    fn send(&mut self, payload: &str) -> Result<()> {
        let streams = self.streams.as_mut().ok_or(KernelError::ChannelUnavailable)?;
        let line = format!("{}\n", payload.trim_start());
        let sent = streams
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| streams.writer.flush());
        if let Err(e) = sent {
            self.mark_dead();
            return Err(e.into());
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let streams = self.streams.as_mut().ok_or(KernelError::ChannelUnavailable)?;
        let mut raw = Vec::new();
        match streams.reader.read_until(b'\n', &mut raw) {
            Ok(0) => {
                self.mark_dead();
                Err(KernelError::ChannelClosed)
            }
            Ok(_) => Ok(String::from_utf8(raw)?),
            Err(e) => {
                self.mark_dead();
                Err(e.into())
            }
        }
    }

    fn mark_dead(&mut self) {
        warn!("REPL channel lost");
        self.teardown();
    }
}

impl Drop for ReplChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}
