use anyhow::{Context, Result};
use argh::FromArgs;
use metacall_kernel::command::ResponseSink;
use metacall_kernel::env::Environment;
use metacall_kernel::{ExecuteRequest, Kernel, KernelConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Drive the MetaCall kernel from a terminal. End a line with `\` to continue
/// the cell on the next line.
struct Args {
    #[argh(option)]
    /// runtime executable for the REPL and one-shot scripts (default: metacall).
    runtime: Option<String>,

    #[argh(option)]
    /// script that starts the persistent REPL (default: repl.js).
    repl_script: Option<String>,

    #[argh(switch)]
    /// do not start the persistent REPL.
    no_repl: bool,

    #[argh(option)]
    /// extra directive language as tag=.ext; may be repeated.
    language: Vec<String>,
}

impl Args {
    fn into_config(self) -> Result<KernelConfig> {
        let mut config = KernelConfig::default();
        if let Some(runtime) = self.runtime {
            config.runtime = runtime;
        }
        if let Some(script) = self.repl_script {
            config.repl_script = script;
        }
        config.start_repl = !self.no_repl;
        for entry in &self.language {
            config
                .add_language(entry)
                .with_context(|| format!("invalid --language `{entry}`, expected tag=.ext"))?;
        }
        Ok(config)
    }
}

/// Prints every response on its own line.
struct TerminalSink(std::io::Stdout);

impl ResponseSink for TerminalSink {
    fn respond(&mut self, text: &str) {
        let mut out = self.0.lock();
        if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
            warn!(error = %e, "failed to print response");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = argh::from_env::<Args>().into_config()?;
    let mut kernel = Kernel::start(config, Environment::new());
    let mut sink = TerminalSink(std::io::stdout());
    let mut rl = DefaultEditor::new()?;

    let mut cell = String::new();
    loop {
        let prompt = if cell.is_empty() {
            format!("In [{}]: ", kernel.execution_count() + 1)
        } else {
            "   ...: ".to_string()
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if let Some(head) = line.strip_suffix('\\') {
                    cell.push_str(head);
                    cell.push('\n');
                    continue;
                }
                cell.push_str(&line);
                let code = std::mem::take(&mut cell);
                if code.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(code.as_str())?;

                let outcome = kernel.execute(ExecuteRequest::new(&code), &mut sink);
                if outcome.shutdown.is_some() {
                    return Ok(());
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("failed to read input"),
        }
    }

    kernel.shutdown(false, &mut sink);
    Ok(())
}
