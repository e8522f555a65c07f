//! OS process execution for invocations.
//!
//! [`SystemInvoker`] implements [`ProcessInvoker`] by spawning the request's
//! executable with a discrete argument vector (never a shell string),
//! draining stdout and stderr on two scoped threads, and polling the child
//! for exit. While it polls it watches the [`CancelSignal`] and the optional
//! timeout; either one terminates the process through the [`ChildGuard`],
//! which also kills the process if supervision is abandoned early.
//!
//! A tool may exit while helpers it started still hold the output pipes.
//! Those helpers are left a grace period to finish, during which
//! cancellation and the timeout still apply, and are then stopped through
//! the process group.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::handle::CancelSignal;
use crate::request::InvocationRequest;
use crate::result::InvocationResult;

use super::capture::capture;
use super::guard::ChildGuard;
use super::spawner::{Spawner, SystemSpawner};
use super::{OutputListener, OutputStream, ProcessInvoker};

/// Tracing target for process invocation.
pub(super) const INVOKER_TARGET: &str = "forge_bridge::invoker";

/// Default delay between the termination request and the forced kill.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Default interval between exit and cancellation checks.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exit code reported when the OS provides none (signal termination).
const SIGNALLED_EXIT_CODE: i32 = -1;

/// Timing knobs for [`SystemInvoker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokerSettings {
    grace_period: Duration,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl InvokerSettings {
    /// Sets how long a terminated process may take to exit before it is
    /// killed.
    #[must_use]
    pub const fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Sets how often the running process is checked.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Limits how long a run may take; `None` disables the limit.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Grace period before a forced kill.
    #[must_use]
    pub const fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Interval between checks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Optional run timeout.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Runs invocations as OS processes.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use forge_bridge::{
///     CancelSignal, InvocationRequest, InvokerSettings, NoopListener, ProcessInvoker,
///     SystemInvoker,
/// };
///
/// let invoker = <SystemInvoker>::default()
///     .with_settings(InvokerSettings::default().with_timeout(Some(Duration::from_secs(60))));
/// let request = InvocationRequest::new("/data/input.csv", "dataforge")?;
/// let result = invoker.invoke(&request, &CancelSignal::detached(), &NoopListener);
/// println!("{}", result.kind());
/// # Ok::<(), forge_bridge::BridgeError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct SystemInvoker<S = SystemSpawner> {
    spawner: S,
    settings: InvokerSettings,
}

impl<S> SystemInvoker<S> {
    /// Creates an invoker that creates processes through `spawner`.
    #[must_use]
    pub fn with_spawner(spawner: S) -> Self {
        Self {
            spawner,
            settings: InvokerSettings::default(),
        }
    }

    /// Replaces the timing settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: InvokerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current timing settings.
    #[must_use]
    pub const fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    /// The spawner processes are created through.
    #[must_use]
    pub const fn spawner(&self) -> &S {
        &self.spawner
    }
}

impl<S: Spawner> ProcessInvoker for SystemInvoker<S> {
    fn invoke(
        &self,
        request: &InvocationRequest,
        cancel: &CancelSignal,
        listener: &dyn OutputListener,
    ) -> InvocationResult {
        if cancel.is_raised() {
            debug!(
                target: INVOKER_TARGET,
                path = %request.target_path().display(),
                "cancelled before spawn"
            );
            return InvocationResult::Cancelled;
        }

        let mut command = build_command(request);
        debug!(
            target: INVOKER_TARGET,
            executable = request.executable(),
            args = ?request.args(),
            "spawning process"
        );

        let child = match self.spawner.spawn(&mut command) {
            Ok(child) => child,
            Err(error) => {
                let reason = describe_spawn_error(request.executable(), &error);
                warn!(target: INVOKER_TARGET, %reason, "spawn failed");
                return InvocationResult::SpawnError { reason };
            }
        };

        let mut guard = ChildGuard::new(child);
        let pid = guard.pid();
        debug!(target: INVOKER_TARGET, pid, "process started");

        let stdout = guard.take_stdout();
        let stderr = guard.take_stderr();

        thread::scope(|scope| {
            let stdout_reader = scope.spawn(|| drain(stdout, OutputStream::Stdout, listener));
            let stderr_reader = scope.spawn(|| drain(stderr, OutputStream::Stderr, listener));

            // The readers only finish once the pipes close, so a process we
            // lost track of is killed before joining them.
            let started = Instant::now();
            let supervised = self
                .supervise(&mut guard, cancel, started)
                .inspect_err(|_| guard.abandon());
            let released = || stdout_reader.is_finished() && stderr_reader.is_finished();
            let exit = match supervised {
                Ok(Exit::Completed(status)) => {
                    Ok(self.settle_helpers(&guard, cancel, started, status, &released))
                }
                other => other,
            };
            let captured = Captured {
                stdout: join_capture(stdout_reader, OutputStream::Stdout),
                stderr: join_capture(stderr_reader, OutputStream::Stderr),
            };

            let result = classify(exit, captured, self.settings.timeout);
            info!(
                target: INVOKER_TARGET,
                pid,
                outcome = result.kind(),
                "process finished"
            );
            result
        })
    }
}

impl<S> SystemInvoker<S> {
    /// Polls the child until it exits, is cancelled, or times out.
    fn supervise(
        &self,
        guard: &mut ChildGuard,
        cancel: &CancelSignal,
        started: Instant,
    ) -> io::Result<Exit> {
        let poll = self.settings.poll_interval;

        loop {
            if let Some(status) = guard.try_wait()? {
                return Ok(Exit::Completed(status));
            }

            if cancel.is_raised() {
                debug!(target: INVOKER_TARGET, pid = guard.pid(), "cancellation observed");
                let status = guard.terminate(self.settings.grace_period, poll)?;
                return Ok(Exit::Cancelled(status));
            }

            if self.timed_out(started) {
                warn!(
                    target: INVOKER_TARGET,
                    pid = guard.pid(),
                    timeout_ms = self.timeout_ms(),
                    "process timed out, terminating"
                );
                let status = guard.terminate(self.settings.grace_period, poll)?;
                return Ok(Exit::TimedOut(status));
            }

            thread::sleep(poll);
        }
    }

    /// Waits for the output pipes to close after the tool itself has exited.
    ///
    /// Helpers still holding them are stopped when the run is cancelled or
    /// times out, or once the grace period has passed.
    fn settle_helpers(
        &self,
        guard: &ChildGuard,
        cancel: &CancelSignal,
        started: Instant,
        status: ExitStatus,
        released: &dyn Fn() -> bool,
    ) -> Exit {
        let grace = self.settings.grace_period;
        let poll = self.settings.poll_interval;
        let exited = Instant::now();

        let exit = loop {
            if released() {
                return Exit::Completed(status);
            }
            if cancel.is_raised() {
                break Exit::Cancelled(status);
            }
            if self.timed_out(started) {
                break Exit::TimedOut(status);
            }
            if exited.elapsed() >= grace {
                break Exit::Completed(status);
            }
            thread::sleep(poll);
        };

        debug!(
            target: INVOKER_TARGET,
            pid = guard.pid(),
            outcome = ?exit,
            "stopping helpers still holding process output"
        );
        #[cfg(unix)]
        guard.stop_group(grace, poll, released);
        exit
    }

    fn timed_out(&self, started: Instant) -> bool {
        self.settings
            .timeout
            .is_some_and(|timeout| started.elapsed() >= timeout)
    }

    fn timeout_ms(&self) -> u64 {
        self.settings
            .timeout
            .map_or(0, |timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
    }
}

/// How supervision ended.
#[derive(Debug)]
enum Exit {
    Completed(ExitStatus),
    Cancelled(ExitStatus),
    TimedOut(ExitStatus),
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn build_command(request: &InvocationRequest) -> Command {
    let mut command = Command::new(request.executable());
    command
        .args(request.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = request.working_dir() {
        command.current_dir(dir);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so termination reaches helpers the tool starts.
        command.process_group(0);
    }
    command
}

fn describe_spawn_error(executable: &str, error: &io::Error) -> String {
    match error.kind() {
        io::ErrorKind::NotFound => format!("executable '{executable}' not found"),
        io::ErrorKind::PermissionDenied => {
            format!("permission denied when starting '{executable}'")
        }
        _ => format!("failed to start '{executable}': {error}"),
    }
}

fn drain(
    pipe: Option<impl Read>,
    stream: OutputStream,
    listener: &dyn OutputListener,
) -> io::Result<Vec<u8>> {
    pipe.map_or_else(|| Ok(Vec::new()), |reader| capture(reader, stream, listener))
}

fn join_capture(handle: ScopedJoinHandle<'_, io::Result<Vec<u8>>>, stream: OutputStream) -> Vec<u8> {
    match handle.join() {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(error)) => {
            warn!(
                target: INVOKER_TARGET,
                stream = stream.as_str(),
                %error,
                "failed to read process output"
            );
            Vec::new()
        }
        Err(_) => {
            warn!(
                target: INVOKER_TARGET,
                stream = stream.as_str(),
                "output reader panicked"
            );
            Vec::new()
        }
    }
}

fn classify(
    exit: io::Result<Exit>,
    captured: Captured,
    timeout: Option<Duration>,
) -> InvocationResult {
    match exit {
        Ok(Exit::Completed(status)) if status.success() => InvocationResult::Success {
            stdout: decode(captured.stdout),
        },
        Ok(Exit::Completed(status)) => InvocationResult::Failure {
            stderr: decode(captured.stderr),
            exit_code: exit_code(status),
        },
        Ok(Exit::Cancelled(status)) => {
            debug!(target: INVOKER_TARGET, ?status, "cancelled process exited");
            InvocationResult::Cancelled
        }
        Ok(Exit::TimedOut(status)) => {
            let limit = timeout.unwrap_or_default();
            let mut stderr = decode(captured.stderr);
            if !stderr.is_empty() && !stderr.ends_with('\n') {
                stderr.push('\n');
            }
            stderr.push_str(&format!("dataforge timed out after {limit:?}"));
            InvocationResult::Failure {
                stderr,
                exit_code: exit_code(status),
            }
        }
        Err(error) => InvocationResult::SpawnError {
            reason: format!("lost track of dataforge process: {error}"),
        },
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALLED_EXIT_CODE)
}

fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned())
}
