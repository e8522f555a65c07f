//! Command dispatch from host triggers to background invocations.
//!
//! The [`CommandDispatcher`] is the public-facing API host adapters call. A
//! trigger is validated on the calling (host) thread, submitted to the
//! [`InvocationRegistry`], and then executed on a dedicated worker thread
//! through a [`ProcessInvoker`]. The worker reports the outcome back to the
//! [`HostAdapter`] as exactly one notification, or none when the run was
//! cancelled or superseded.
//!
//! The host thread never waits on the external tool.

mod worker;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::BridgeError;
use crate::host::{HostAdapter, RUN_ON_FILE_COMMAND};
use crate::invoker::ProcessInvoker;
use crate::registry::InvocationRegistry;
use crate::request::InvocationRequest;
use crate::result::Notification;

use self::worker::Worker;

/// Tracing target for dispatcher operations.
pub(crate) const DISPATCH_TARGET: &str = "forge_bridge::dispatcher";

/// How the dispatcher turns a target file into a command line.
///
/// With no path flag or extra arguments the tool is run as
/// `<executable> <absolute path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    executable: String,
    path_flag: Option<String>,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl DispatchSettings {
    /// Settings that run `executable` with only the target path.
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            path_flag: None,
            extra_args: Vec::new(),
            working_dir: None,
        }
    }

    /// Inserts `flag` immediately before the target path, as in
    /// `dataforge --path <file>`.
    #[must_use]
    pub fn with_path_flag(mut self, flag: Option<String>) -> Self {
        self.path_flag = flag.filter(|value| !value.trim().is_empty());
        self
    }

    /// Adds fixed arguments ahead of the path flag and target.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Runs the tool from `dir` instead of the bridge's working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }

    /// Configured executable.
    #[must_use]
    pub const fn executable(&self) -> &str {
        self.executable.as_str()
    }

    /// Flag placed before the target path, if any.
    #[must_use]
    pub fn path_flag(&self) -> Option<&str> {
        self.path_flag.as_deref()
    }

    /// Builds a validated request for `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`BridgeError`] when the target is empty, missing or not a
    /// regular file, or when no executable is configured.
    pub fn request_for(&self, target: &Path) -> Result<InvocationRequest, BridgeError> {
        let args = self
            .extra_args
            .iter()
            .cloned()
            .chain(self.path_flag.clone())
            .collect();
        let mut request =
            InvocationRequest::new(target, self.executable.as_str())?.with_extra_args(args);
        if let Some(dir) = &self.working_dir {
            request = request.with_working_dir(dir);
        }
        Ok(request)
    }
}

/// Counts live worker threads so callers off the host thread can wait for
/// every result to be delivered.
#[derive(Debug, Default)]
struct WorkerTracker {
    active: Mutex<usize>,
    idle: Condvar,
}

impl WorkerTracker {
    fn enter(self: &Arc<Self>) -> WorkerSlot {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        WorkerSlot(Arc::clone(self))
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let (remaining, _) = self
            .idle
            .wait_timeout_while(active, timeout, |count| *count > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *remaining == 0
    }
}

/// Releases its worker's slot on drop, including when the thread could not
/// be started.
#[derive(Debug)]
struct WorkerSlot(Arc<WorkerTracker>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        let mut active = self.0.active.lock().unwrap_or_else(PoisonError::into_inner);
        *active = active.saturating_sub(1);
        if *active == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// Turns host triggers into background invocations and reports results.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use forge_bridge::{
///     CommandDispatcher, CommandHandler, DispatchSettings, HostAdapter, SystemInvoker,
/// };
///
/// struct Quiet;
///
/// impl HostAdapter for Quiet {
///     fn register_command(&self, _command_id: &str, _handler: CommandHandler) {}
///     fn show_info(&self, _text: &str) {}
///     fn show_warning(&self, _text: &str) {}
///     fn show_error(&self, _text: &str) {}
/// }
///
/// let settings = DispatchSettings::new("dataforge").with_path_flag(Some("--path".into()));
/// let dispatcher = CommandDispatcher::new(<SystemInvoker>::default(), Arc::new(Quiet), settings);
/// dispatcher.on_trigger(Path::new("/data/report.csv"));
/// assert!(dispatcher.wait_idle(Duration::from_secs(30)));
/// ```
pub struct CommandDispatcher<I> {
    invoker: Arc<I>,
    registry: Arc<InvocationRegistry>,
    host: Arc<dyn HostAdapter>,
    settings: DispatchSettings,
    workers: Arc<WorkerTracker>,
}

impl<I> CommandDispatcher<I> {
    /// Creates a dispatcher with its own, empty registry.
    #[must_use]
    pub fn new(invoker: I, host: Arc<dyn HostAdapter>, settings: DispatchSettings) -> Self {
        Self {
            invoker: Arc::new(invoker),
            registry: Arc::new(InvocationRegistry::new()),
            host,
            settings,
            workers: Arc::default(),
        }
    }

    /// Registry of in-flight invocations.
    #[must_use]
    pub const fn registry(&self) -> &Arc<InvocationRegistry> {
        &self.registry
    }

    /// Command-line settings.
    #[must_use]
    pub const fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Requests cancellation of the run for `target`.
    ///
    /// The path is canonicalised the same way triggers are, so any spelling
    /// of the file works. Returns `false` when nothing cancellable was
    /// running; the eventual `Cancelled` outcome is not reported.
    pub fn cancel(&self, target: &Path) -> bool {
        let key = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
        self.registry.cancel(&key)
    }

    /// Blocks until every worker has reported, or `timeout` elapses.
    ///
    /// Returns `true` when idle. Must not be called from the host's UI
    /// thread.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.workers.wait_idle(timeout)
    }
}

impl<I: ProcessInvoker + 'static> CommandDispatcher<I> {
    /// Registers the run-on-file command with the host.
    ///
    /// The handler holds only a weak reference, so the host keeping the
    /// handler does not keep the dispatcher alive.
    pub fn install(self: &Arc<Self>) {
        let dispatcher = Arc::downgrade(self);
        self.host.register_command(
            RUN_ON_FILE_COMMAND,
            Box::new(move |target: &Path| {
                if let Some(live) = dispatcher.upgrade() {
                    live.on_trigger(target);
                }
            }),
        );
        info!(
            target: DISPATCH_TARGET,
            command = RUN_ON_FILE_COMMAND,
            "command registered"
        );
    }

    /// Handles one user trigger for `target`. Returns without waiting for
    /// the tool.
    ///
    /// Invalid targets are reported through
    /// [`HostAdapter::show_error`] without touching the registry.
    pub fn on_trigger(&self, target: &Path) {
        let request = match self.settings.request_for(target) {
            Ok(request) => request,
            Err(rejection) => {
                warn!(
                    target: DISPATCH_TARGET,
                    path = %target.display(),
                    error = %rejection,
                    "trigger rejected"
                );
                Notification::from(&rejection).deliver(self.host.as_ref());
                return;
            }
        };

        let handle = self.registry.submit(&request);
        let id = handle.id();
        let signal = handle.cancel_signal();
        drop(handle);

        let path = request.target_path().to_path_buf();
        info!(
            target: DISPATCH_TARGET,
            path = %path.display(),
            invocation_id = %id,
            "invocation submitted"
        );
        self.host.report_progress(
            &path,
            &format!("Executing DataForge on {}...", request.display_name()),
        );

        let slot = self.workers.enter();
        let worker = Worker {
            invoker: Arc::clone(&self.invoker),
            registry: Arc::clone(&self.registry),
            host: Arc::clone(&self.host),
            request,
            id,
            signal,
        };
        let spawned = thread::Builder::new()
            .name(format!("dataforge-{id}"))
            .spawn(move || {
                worker.run();
                drop(slot);
            });

        if let Err(source) = spawned {
            let failure = BridgeError::WorkerSpawn {
                path: path.clone(),
                source: Arc::new(source),
            };
            error!(
                target: DISPATCH_TARGET,
                invocation_id = %id,
                error = %failure,
                "failed to start worker"
            );
            if self.registry.complete(&path, id) {
                Notification::from(&failure).deliver(self.host.as_ref());
            }
        }
    }
}
