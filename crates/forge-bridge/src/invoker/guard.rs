//! Scoped ownership of a spawned child process.
//!
//! [`ChildGuard`] guarantees that the process it wraps has exited and been
//! reaped before the guard goes away. Termination is two-phase: a polite
//! request (SIGTERM to the child's process group on Unix), then a forced
//! kill once the grace period runs out.

use std::io;
use std::process::{Child, ChildStderr, ChildStdout, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::process::INVOKER_TARGET;

#[derive(Debug)]
pub(super) struct ChildGuard {
    child: Child,
    status: Option<ExitStatus>,
}

impl ChildGuard {
    pub(super) const fn new(child: Child) -> Self {
        Self {
            child,
            status: None,
        }
    }

    pub(super) fn pid(&self) -> u32 {
        self.child.id()
    }

    pub(super) fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub(super) fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Non-blocking exit check; remembers the status once reaped.
    pub(super) fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        if self.status.is_none() {
            self.status = self.child.try_wait()?;
        }
        Ok(self.status)
    }

    /// Stops the process and waits for it, escalating to a kill after
    /// `grace`.
    pub(super) fn terminate(&mut self, grace: Duration, poll: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.try_wait()? {
            return Ok(status);
        }

        if self.request_termination() {
            let deadline = Instant::now() + grace;
            while Instant::now() < deadline {
                if let Some(status) = self.try_wait()? {
                    debug!(
                        target: INVOKER_TARGET,
                        pid = self.pid(),
                        ?status,
                        "process exited after termination request"
                    );
                    return Ok(status);
                }
                thread::sleep(poll);
            }
            warn!(
                target: INVOKER_TARGET,
                pid = self.pid(),
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "grace period elapsed, killing process"
            );
        }

        self.kill()
    }

    fn kill(&mut self) -> io::Result<ExitStatus> {
        #[cfg(unix)]
        signal_group(self.pid(), nix::sys::signal::Signal::SIGKILL);

        match self.child.kill() {
            Ok(()) => {}
            // Already reaped by the OS; `wait` below returns the status.
            Err(error) if error.kind() == io::ErrorKind::InvalidInput => {}
            Err(error) => return Err(error),
        }
        let status = self.child.wait()?;
        self.status = Some(status);
        Ok(status)
    }

    /// Stops what remains of the process group once the leader has been
    /// reaped, killing it if `released` still reports open pipes after
    /// `grace`.
    #[cfg(unix)]
    pub(super) fn stop_group(&self, grace: Duration, poll: Duration, released: &dyn Fn() -> bool) {
        use nix::sys::signal::Signal;

        signal_group(self.pid(), Signal::SIGTERM);
        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if released() {
                return;
            }
            thread::sleep(poll);
        }
        warn!(
            target: INVOKER_TARGET,
            pid = self.pid(),
            "helpers ignored termination, killing process group"
        );
        signal_group(self.pid(), Signal::SIGKILL);
    }

    /// Sends the polite termination request. Returns `false` where the
    /// platform has none, in which case the caller kills immediately.
    #[cfg(unix)]
    fn request_termination(&self) -> bool {
        signal_group(self.pid(), nix::sys::signal::Signal::SIGTERM);
        true
    }

    #[cfg(not(unix))]
    fn request_termination(&self) -> bool {
        false
    }
}

impl ChildGuard {
    /// Kills the process without a grace period if it has not been reaped.
    pub(super) fn abandon(&mut self) {
        if self.status.is_some() {
            return;
        }
        warn!(
            target: INVOKER_TARGET,
            pid = self.pid(),
            "process still running when abandoned, killing"
        );
        if let Err(error) = self.kill() {
            warn!(
                target: INVOKER_TARGET,
                pid = self.pid(),
                %error,
                "failed to kill abandoned process"
            );
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        self.abandon();
    }
}

/// Signals the child's whole process group so helpers it started go too.
#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(error) => warn!(
            target: INVOKER_TARGET,
            pid,
            ?signal,
            %error,
            "failed to signal process group"
        ),
    }
}
