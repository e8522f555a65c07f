//! Terminal implementation of the bridge's host capabilities.
//!
//! [`TerminalHost`] is called from worker threads, so it never writes to the
//! terminal itself. Every notification and progress update is queued as a
//! [`HostEvent`] and rendered by the thread that owns the output streams.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};

use forge_bridge::{CommandHandler, HostAdapter, Notification};
use tracing::debug;

use crate::CLI_TARGET;

/// Prefix for successful tool output.
pub(crate) const OUTPUT_PREFIX: &str = "DataForge output: ";
/// Prefix for output of a tool that exited with a failure status.
pub(crate) const STDERR_PREFIX: &str = "DataForge stderr: ";
/// Prefix for runs that could not execute the tool at all.
pub(crate) const ERROR_PREFIX: &str = "Error executing DataForge: ";

/// Something the bridge asked the host to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostEvent {
    Notify(Notification),
    Progress { target: PathBuf, text: String },
}

/// Queues host calls for rendering on the terminal.
pub(crate) struct TerminalHost {
    events: Mutex<Sender<HostEvent>>,
    commands: Mutex<HashMap<String, CommandHandler>>,
}

impl TerminalHost {
    /// Creates a host and the receiving end of its event queue.
    pub(crate) fn channel() -> (Self, Receiver<HostEvent>) {
        let (sender, receiver) = mpsc::channel();
        let host = Self {
            events: Mutex::new(sender),
            commands: Mutex::new(HashMap::new()),
        };
        (host, receiver)
    }

    /// Runs the handler registered for `command_id`, as a user would from
    /// an editor's command palette. Returns `false` when nothing is
    /// registered under that id.
    pub(crate) fn trigger(&self, command_id: &str, target: &Path) -> bool {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        commands.get(command_id).is_some_and(|handler| {
            handler(target);
            true
        })
    }

    fn send(&self, event: HostEvent) {
        let sender = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if sender.send(event).is_err() {
            debug!(target: CLI_TARGET, "renderer gone, host event dropped");
        }
    }
}

impl HostAdapter for TerminalHost {
    fn register_command(&self, command_id: &str, handler: CommandHandler) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(command_id.to_owned(), handler);
    }

    fn show_info(&self, text: &str) {
        self.send(HostEvent::Notify(Notification::Info(text.to_owned())));
    }

    fn show_warning(&self, text: &str) {
        self.send(HostEvent::Notify(Notification::Warning(text.to_owned())));
    }

    fn show_error(&self, text: &str) {
        self.send(HostEvent::Notify(Notification::Error(text.to_owned())));
    }

    fn report_progress(&self, target: &Path, text: &str) {
        self.send(HostEvent::Progress {
            target: target.to_path_buf(),
            text: text.to_owned(),
        });
    }
}

/// Counts of rendered notifications.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub(crate) infos: usize,
    pub(crate) warnings: usize,
    pub(crate) errors: usize,
}

impl Tally {
    /// Whether every one of `expected` runs reported success.
    pub(crate) const fn all_succeeded(&self, expected: usize) -> bool {
        self.warnings == 0 && self.errors == 0 && self.infos == expected
    }
}

/// Writes one event to the terminal and records it in `tally`.
pub(crate) fn render<W: Write, E: Write>(
    event: &HostEvent,
    stdout: &mut W,
    stderr: &mut E,
    tally: &mut Tally,
) -> io::Result<()> {
    match event {
        HostEvent::Notify(Notification::Info(text)) => {
            tally.infos += 1;
            writeln!(stdout, "{OUTPUT_PREFIX}{}", text.trim_end())
        }
        HostEvent::Notify(Notification::Warning(text)) => {
            tally.warnings += 1;
            writeln!(stderr, "{STDERR_PREFIX}{}", text.trim_end())
        }
        HostEvent::Notify(Notification::Error(text)) => {
            tally.errors += 1;
            writeln!(stderr, "{ERROR_PREFIX}{}", text.trim_end())
        }
        HostEvent::Progress { text, .. } => writeln!(stderr, "{text}"),
    }
}
