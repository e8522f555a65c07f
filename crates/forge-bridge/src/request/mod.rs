//! Immutable description of one run of the external tool.
//!
//! An [`InvocationRequest`] is validated on construction: the target must be
//! a non-empty path to an existing regular file, and it is stored in absolute
//! canonical form so the registry keys different spellings of the same file
//! identically.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::BridgeError;

/// Validated request to run an executable against one target file.
///
/// # Example
///
/// ```no_run
/// use forge_bridge::InvocationRequest;
///
/// let request = InvocationRequest::new("data/input.csv", "dataforge")?
///     .with_extra_args(vec!["--path".into()]);
/// assert!(request.target_path().is_absolute());
/// assert_eq!(request.args().len(), 2);
/// # Ok::<(), forge_bridge::BridgeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    target_path: PathBuf,
    executable: String,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl InvocationRequest {
    /// Validates the target and builds a request with no extra arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::EmptyExecutable`] for a blank executable, or
    /// any error from [`resolve_target`].
    pub fn new(target: impl AsRef<Path>, executable: impl Into<String>) -> Result<Self, BridgeError> {
        let executable = executable.into();
        if executable.trim().is_empty() {
            return Err(BridgeError::EmptyExecutable);
        }
        Ok(Self {
            target_path: resolve_target(target.as_ref())?,
            executable,
            extra_args: Vec::new(),
            working_dir: None,
        })
    }

    /// Sets the arguments placed before the target path.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    /// Sets the directory the tool runs in.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    /// Absolute path of the file the tool runs against.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Program name or path to execute.
    #[must_use]
    pub const fn executable(&self) -> &str {
        self.executable.as_str()
    }

    /// Arguments placed before the target path.
    #[must_use]
    pub fn extra_args(&self) -> &[String] {
        &self.extra_args
    }

    /// Directory the tool runs in, if overridden.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Full argument vector: the extra arguments followed by the target.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        self.extra_args
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(self.target_path.clone().into_os_string()))
            .collect()
    }

    /// File name of the target, for progress messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.target_path.file_name().map_or_else(
            || self.target_path.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// Checks that `path` names an existing regular file and makes it absolute.
///
/// # Errors
///
/// - [`BridgeError::EmptyPath`] when the path is empty or blank.
/// - [`BridgeError::MissingPath`] when nothing exists at the path.
/// - [`BridgeError::NotAFile`] for directories and other non-files.
/// - [`BridgeError::Resolve`] when the path cannot be inspected.
pub fn resolve_target(path: &Path) -> Result<PathBuf, BridgeError> {
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(BridgeError::EmptyPath);
    }

    let metadata = fs::metadata(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => BridgeError::MissingPath {
            path: path.to_path_buf(),
        },
        _ => BridgeError::Resolve {
            path: path.to_path_buf(),
            source: Arc::new(error),
        },
    })?;

    if !metadata.is_file() {
        return Err(BridgeError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    fs::canonicalize(path).map_err(|error| BridgeError::Resolve {
        path: path.to_path_buf(),
        source: Arc::new(error),
    })
}
