//! Handles for running invocations and the cancellation signal derived from
//! them.
//!
//! The [`InvocationRegistry`](crate::InvocationRegistry) owns every
//! [`InvocationHandle`]. The process invoker only ever sees a
//! [`CancelSignal`], a weak back-reference that reads the handle's
//! cancellation flag. When the registry drops a handle the signal can no
//! longer be upgraded and reads as raised, so an abandoned run is torn down
//! the same way as a cancelled one.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime};

/// Identifier unique to one invocation within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(u64);

impl InvocationId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One running invocation tracked by the registry.
#[derive(Debug)]
pub struct InvocationHandle {
    id: InvocationId,
    target_path: PathBuf,
    started_at: SystemTime,
    cancelled: AtomicBool,
}

impl InvocationHandle {
    pub(crate) fn new(id: InvocationId, target_path: PathBuf) -> Self {
        Self {
            id,
            target_path,
            started_at: SystemTime::now(),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Unique identifier of the run.
    #[must_use]
    pub const fn id(&self) -> InvocationId {
        self.id
    }

    /// File the run targets.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Wall-clock time the run was submitted.
    #[must_use]
    pub const fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time since submission; zero if the clock went backwards.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed().unwrap_or_default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Raises the cancellation flag; returns `false` if it was already set.
    pub(crate) fn request_cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    /// Derives the weak signal handed to the process invoker.
    #[must_use]
    pub fn cancel_signal(self: &Arc<Self>) -> CancelSignal {
        CancelSignal {
            handle: Some(Arc::downgrade(self)),
        }
    }
}

/// Read-only view of a handle's cancellation flag.
///
/// # Example
///
/// ```
/// use forge_bridge::CancelSignal;
///
/// let signal = CancelSignal::detached();
/// assert!(!signal.is_raised());
/// ```
#[derive(Debug, Clone)]
pub struct CancelSignal {
    handle: Option<Weak<InvocationHandle>>,
}

impl CancelSignal {
    /// A signal that is never raised, for runs outside any registry.
    #[must_use]
    pub const fn detached() -> Self {
        Self { handle: None }
    }

    /// Returns `true` once the handle is cancelled or has been dropped.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.handle.as_ref().is_some_and(|weak| {
            weak.upgrade()
                .is_none_or(|handle| handle.is_cancelled())
        })
    }
}
