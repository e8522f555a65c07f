//! The point where an OS process is actually created.

use std::io;
use std::process::{Child, Command};
use std::sync::Arc;

/// Creates OS processes from fully prepared commands.
///
/// Kept as a seam so tests can observe exactly which processes were
/// allocated.
pub trait Spawner: Send + Sync {
    /// Spawns `command`.
    ///
    /// # Errors
    ///
    /// Returns the operating system error when the process cannot be
    /// created.
    fn spawn(&self, command: &mut Command) -> io::Result<Child>;
}

/// Spawns processes with [`Command::spawn`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn spawn(&self, command: &mut Command) -> io::Result<Child> {
        command.spawn()
    }
}

impl<S: Spawner + ?Sized> Spawner for Arc<S> {
    fn spawn(&self, command: &mut Command) -> io::Result<Child> {
        (**self).spawn(command)
    }
}
