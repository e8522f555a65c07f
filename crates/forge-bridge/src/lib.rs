//! Invocation bridge between code editors and the `dataforge` tool.
//!
//! Editors expose a command that runs `dataforge` against the selected file.
//! This crate owns everything between the user's trigger and the message the
//! editor finally shows: validating the target, spawning the tool with an
//! explicit argument vector, tracking in-flight runs per file, cancelling
//! superseded runs, and classifying the outcome.
//!
//! # Architecture
//!
//! The bridge is layered leaves first:
//!
//! - [`invoker`]: the [`ProcessInvoker`] seam and its production
//!   implementation, [`SystemInvoker`], which spawns one OS process, captures
//!   both output streams, and resolves to an [`InvocationResult`].
//! - [`registry`]: the [`InvocationRegistry`], which keeps at most one running
//!   [`InvocationHandle`] per target file and applies cancel-and-replace.
//! - [`dispatcher`]: the [`CommandDispatcher`], which turns a trigger into a
//!   request, runs it on a worker thread, and reports the outcome through the
//!   [`HostAdapter`].
//!
//! Host adapters implement [`HostAdapter`]; the core never branches on which
//! editor it is talking to.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use forge_bridge::{
//!     CommandDispatcher, CommandHandler, DispatchSettings, HostAdapter, SystemInvoker,
//! };
//!
//! struct LogHost;
//!
//! impl HostAdapter for LogHost {
//!     fn register_command(&self, _command_id: &str, _handler: CommandHandler) {}
//!     fn show_info(&self, text: &str) { eprintln!("info: {text}"); }
//!     fn show_warning(&self, text: &str) { eprintln!("warning: {text}"); }
//!     fn show_error(&self, text: &str) { eprintln!("error: {text}"); }
//! }
//!
//! let dispatcher = Arc::new(CommandDispatcher::new(
//!     <SystemInvoker>::default(),
//!     Arc::new(LogHost),
//!     DispatchSettings::new("dataforge"),
//! ));
//! dispatcher.install();
//! dispatcher.on_trigger(Path::new("/data/report.csv"));
//! ```

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod host;
pub mod invoker;
pub mod registry;
pub mod request;
pub mod result;

#[cfg(test)]
mod tests;

pub use self::dispatcher::{CommandDispatcher, DispatchSettings};
pub use self::error::BridgeError;
pub use self::handle::{CancelSignal, InvocationHandle, InvocationId};
pub use self::host::{CommandHandler, HostAdapter, RUN_ON_FILE_COMMAND};
pub use self::invoker::{
    InvokerSettings, NoopListener, OutputListener, OutputStream, ProcessInvoker, Spawner,
    SystemInvoker, SystemSpawner,
};
pub use self::registry::InvocationRegistry;
pub use self::request::InvocationRequest;
pub use self::result::{InvocationResult, Notification};
