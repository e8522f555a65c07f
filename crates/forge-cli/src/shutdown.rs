//! Cancels in-flight invocations when the process is asked to stop.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use forge_bridge::InvocationRegistry;
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{info, warn};

use crate::CLI_TARGET;

/// Background listener that turns termination signals into cancellations.
///
/// Dropping the listener unregisters the handlers and joins its thread.
#[derive(Debug)]
pub(crate) struct ShutdownListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl ShutdownListener {
    /// Starts listening for SIGTERM, SIGINT, SIGQUIT and SIGHUP.
    pub(crate) fn spawn(registry: Arc<InvocationRegistry>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name(String::from("dataforge-signals"))
            .spawn(move || {
                for signal in signals.forever() {
                    let cancelled = registry.cancel_all();
                    info!(
                        target: CLI_TARGET,
                        signal,
                        cancelled,
                        "shutdown signal received, cancelling invocations"
                    );
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for ShutdownListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: CLI_TARGET, "signal listener panicked");
        }
    }
}
