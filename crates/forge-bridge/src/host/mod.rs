//! Capability set every editor integration exposes to the bridge.
//!
//! Each editor gets one [`HostAdapter`] implementation. The bridge only ever
//! registers its command and pushes text through the three notification
//! calls, so adapters stay thin wrappers around the editor's own APIs.

use std::path::Path;

/// Identifier under which the bridge registers its editor command.
pub const RUN_ON_FILE_COMMAND: &str = "dataforge.runOnFile";

/// Callback a host invokes when the user runs the registered command.
pub type CommandHandler = Box<dyn Fn(&Path) + Send + Sync>;

/// Editor-specific integration called by the
/// [`CommandDispatcher`](crate::CommandDispatcher).
///
/// All calls are fire-and-forget. They may arrive on worker threads, so
/// implementations marshal onto the editor's UI thread themselves.
pub trait HostAdapter: Send + Sync {
    /// Binds `handler` to the editor command `command_id`.
    fn register_command(&self, command_id: &str, handler: CommandHandler);

    /// Shows an informational message.
    fn show_info(&self, text: &str);

    /// Shows a warning.
    fn show_warning(&self, text: &str);

    /// Shows an error.
    fn show_error(&self, text: &str);

    /// Updates a progress indicator for a running invocation.
    ///
    /// Hosts without progress UI can ignore this.
    fn report_progress(&self, target: &Path, text: &str) {
        let _ = (target, text);
    }
}
