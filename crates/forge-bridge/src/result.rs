//! Host-independent outcome taxonomy for invocations.

use crate::error::BridgeError;
use crate::host::HostAdapter;

/// Terminal outcome of one invocation, produced exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    /// The tool exited with status zero.
    Success {
        /// Everything the tool wrote to standard output.
        stdout: String,
    },
    /// The tool ran and exited with a non-zero status.
    Failure {
        /// Everything the tool wrote to standard error.
        stderr: String,
        /// Exit status, or `-1` when the process was ended by a signal.
        exit_code: i32,
    },
    /// The tool could not be started.
    SpawnError {
        /// Human-readable cause.
        reason: String,
    },
    /// The run was cancelled or superseded before it finished.
    Cancelled,
}

impl InvocationResult {
    /// Returns `true` for [`InvocationResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns `true` for [`InvocationResult::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Stable label used in structured logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::SpawnError { .. } => "spawn_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Maps the outcome to the notification a host should show, if any.
    ///
    /// A non-zero exit is a warning (the tool ran and flagged something); a
    /// spawn failure is an error (the tool could not run). Cancellation is
    /// silent.
    #[must_use]
    pub fn notification(&self) -> Option<Notification> {
        match self {
            Self::Success { stdout } => Some(Notification::Info(stdout.clone())),
            Self::Failure { stderr, .. } => Some(Notification::Warning(stderr.clone())),
            Self::SpawnError { reason } => Some(Notification::Error(reason.clone())),
            Self::Cancelled => None,
        }
    }
}

/// A message for one of the host's three notification calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Rendered with [`HostAdapter::show_info`].
    Info(String),
    /// Rendered with [`HostAdapter::show_warning`].
    Warning(String),
    /// Rendered with [`HostAdapter::show_error`].
    Error(String),
}

impl Notification {
    /// Text carried by the notification.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Info(text) | Self::Warning(text) | Self::Error(text) => text,
        }
    }

    /// Hands the notification to the matching host call.
    pub fn deliver(&self, host: &dyn HostAdapter) {
        match self {
            Self::Info(text) => host.show_info(text),
            Self::Warning(text) => host.show_warning(text),
            Self::Error(text) => host.show_error(text),
        }
    }
}

impl From<&BridgeError> for Notification {
    fn from(error: &BridgeError) -> Self {
        Self::Error(error.to_string())
    }
}
