//! Process invocation seam.
//!
//! [`ProcessInvoker`] abstracts running one external process to completion so
//! the dispatcher can be exercised with test doubles that never spawn
//! anything. The production implementation is [`SystemInvoker`], which
//! spawns the tool as an OS process through a [`Spawner`], streams both
//! output pipes, and honours the [`CancelSignal`].

mod capture;
mod guard;
mod process;
mod spawner;

use crate::handle::CancelSignal;
use crate::request::InvocationRequest;
use crate::result::InvocationResult;

pub use self::process::{InvokerSettings, SystemInvoker};
pub use self::spawner::{Spawner, SystemSpawner};

/// Which pipe a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

impl OutputStream {
    /// Lower-case stream name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Receives output lines while a process is still running.
///
/// Lines arrive without their trailing newline, possibly from two threads at
/// once (one per stream).
pub trait OutputListener: Send + Sync {
    /// Called for every complete or final partial line.
    fn on_line(&self, stream: OutputStream, line: &str);
}

/// Listener that discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl OutputListener for NoopListener {
    fn on_line(&self, _stream: OutputStream, _line: &str) {}
}

/// Runs a single external process to a terminal [`InvocationResult`].
///
/// # Example
///
/// ```
/// use forge_bridge::{
///     CancelSignal, InvocationRequest, InvocationResult, OutputListener, ProcessInvoker,
/// };
///
/// struct CannedInvoker;
///
/// impl ProcessInvoker for CannedInvoker {
///     fn invoke(
///         &self,
///         _request: &InvocationRequest,
///         _cancel: &CancelSignal,
///         _listener: &dyn OutputListener,
///     ) -> InvocationResult {
///         InvocationResult::Success { stdout: String::from("ok") }
///     }
/// }
/// ```
pub trait ProcessInvoker: Send + Sync {
    /// Spawns the request's executable with its argument vector and blocks
    /// the calling worker until the process has exited.
    ///
    /// Implementations must poll `cancel` while the process runs and return
    /// [`InvocationResult::Cancelled`] only after the process is gone.
    fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &CancelSignal,
        listener: &dyn OutputListener,
    ) -> InvocationResult;
}
