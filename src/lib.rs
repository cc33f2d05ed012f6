//! A command dispatcher between a notebook front-end and a persistent REPL.
//!
//! Each cell is split into leading `>lang` directives and a payload, then
//! routed: `$help`, `!shell`, `%inspect`, `%load`, `$newfile` and `$shutdown`
//! are handled by name, a directive runs the payload as a one-shot script, and
//! anything else is forwarded line by line to the long-lived runtime process.
//!
//! The main entry point is [`Kernel`]. It owns a [`ReplChannel`] and answers
//! through any [`ResponseSink`](command::ResponseSink).

mod builtin;
pub mod channel;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
pub mod io_adapters;
mod kernel;
pub mod magic;
pub mod normalize;
pub mod script;

pub use channel::ReplChannel;
pub use config::KernelConfig;
pub use error::{KernelError, Result};
pub use kernel::{ExecuteOutcome, ExecuteReply, ExecuteRequest, Kernel, ShutdownReply};
