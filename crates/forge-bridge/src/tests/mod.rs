//! Crate-level test support and BDD scenarios.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::Mutex;
use std::time::Duration;

use crate::host::{CommandHandler, HostAdapter};
use crate::invoker::{InvokerSettings, Spawner, SystemSpawner};
use crate::request::InvocationRequest;
use crate::result::Notification;

#[cfg(unix)]
mod behaviour;

/// Shell used to run test scripts; scripts are passed as its first argument
/// so they never need to be executable themselves.
pub(crate) const SHELL: &str = "/bin/sh";

/// Upper bound for waiting on asynchronous results in tests.
pub(crate) const SETTLE: Duration = Duration::from_secs(10);

/// Writes a shell script body to `dir/name`.
pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("{body}\n")).expect("write script");
    path
}

/// Writes a target file the tool will be pointed at.
pub(crate) fn write_target(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, "id,value\n1,2\n").expect("write target");
    path
}

/// Builds a request that runs `script` through the shell against `target`.
pub(crate) fn script_request(script: &Path, target: &Path) -> InvocationRequest {
    InvocationRequest::new(target, SHELL)
        .expect("valid request")
        .with_extra_args(vec![script.to_string_lossy().into_owned()])
}

/// Invoker timings tuned for fast tests.
pub(crate) fn fast_settings() -> InvokerSettings {
    InvokerSettings::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_grace_period(Duration::from_millis(500))
}

/// Spawner that records the PID of every process it creates.
#[derive(Debug, Default)]
pub(crate) struct RecordingSpawner {
    pids: Mutex<Vec<u32>>,
}

impl RecordingSpawner {
    pub(crate) fn pids(&self) -> Vec<u32> {
        self.pids.lock().expect("pids mutex poisoned").clone()
    }
}

impl Spawner for RecordingSpawner {
    fn spawn(&self, command: &mut Command) -> io::Result<Child> {
        let child = SystemSpawner.spawn(command)?;
        self.pids.lock().expect("pids mutex poisoned").push(child.id());
        Ok(child)
    }
}

/// Host double that records everything the bridge tells it.
#[derive(Default)]
pub(crate) struct RecordingHost {
    notifications: Mutex<Vec<Notification>>,
    progress: Mutex<Vec<(PathBuf, String)>>,
    commands: Mutex<HashMap<String, CommandHandler>>,
}

impl RecordingHost {
    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .expect("notifications mutex poisoned")
            .clone()
    }

    pub(crate) fn progress(&self) -> Vec<(PathBuf, String)> {
        self.progress.lock().expect("progress mutex poisoned").clone()
    }

    pub(crate) fn command_ids(&self) -> Vec<String> {
        self.commands
            .lock()
            .expect("commands mutex poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Simulates the user running a registered command.
    pub(crate) fn run_command(&self, command_id: &str, target: &Path) {
        let commands = self.commands.lock().expect("commands mutex poisoned");
        let handler = commands.get(command_id).expect("command registered");
        handler(target);
    }

    fn record(&self, notification: Notification) {
        self.notifications
            .lock()
            .expect("notifications mutex poisoned")
            .push(notification);
    }
}

impl HostAdapter for RecordingHost {
    fn register_command(&self, command_id: &str, handler: CommandHandler) {
        self.commands
            .lock()
            .expect("commands mutex poisoned")
            .insert(command_id.to_owned(), handler);
    }

    fn show_info(&self, text: &str) {
        self.record(Notification::Info(text.to_owned()));
    }

    fn show_warning(&self, text: &str) {
        self.record(Notification::Warning(text.to_owned()));
    }

    fn show_error(&self, text: &str) {
        self.record(Notification::Error(text.to_owned()));
    }

    fn report_progress(&self, target: &Path, text: &str) {
        self.progress
            .lock()
            .expect("progress mutex poisoned")
            .push((target.to_path_buf(), text.to_owned()));
    }
}
