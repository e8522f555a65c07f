//! Domain errors raised before an invocation reaches the external tool.
//!
//! Outcomes of the tool itself (non-zero exit, spawn failure, cancellation)
//! are not errors at this level; they are variants of
//! [`InvocationResult`](crate::InvocationResult). `BridgeError` covers the
//! cases where the bridge refuses to start a run at all. I/O errors are
//! wrapped in `Arc` to satisfy the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising while preparing an invocation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The trigger did not carry a target file.
    #[error("No file selected.")]
    EmptyPath,

    /// The target file does not exist.
    #[error("file '{}' does not exist", path.display())]
    MissingPath {
        /// Path supplied by the host.
        path: PathBuf,
    },

    /// The target exists but is not a regular file.
    #[error("'{}' is not a file", path.display())]
    NotAFile {
        /// Path supplied by the host.
        path: PathBuf,
    },

    /// The target could not be inspected or made absolute.
    #[error("failed to resolve '{}': {source}", path.display())]
    Resolve {
        /// Path supplied by the host.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// No executable name was configured.
    #[error("no dataforge executable configured")]
    EmptyExecutable,

    /// The worker thread that supervises the run could not be started.
    #[error("failed to start worker for '{}': {source}", path.display())]
    WorkerSpawn {
        /// Target file of the abandoned invocation.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl BridgeError {
    /// Returns `true` when the error stems from an unusable trigger rather
    /// than from the bridge's own resources.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPath | Self::MissingPath { .. } | Self::NotAFile { .. } | Self::Resolve { .. }
        )
    }
}

#[cfg(test)]
mod tests;
