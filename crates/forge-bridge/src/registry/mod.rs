//! Registry of in-flight invocations keyed by target file.
//!
//! The [`InvocationRegistry`] is the only mutable shared state in the bridge.
//! It enforces at most one running [`InvocationHandle`] per target path using
//! cancel-and-replace: submitting a second request for a path flags the
//! previous handle as cancelled and drops it before the new handle is
//! inserted. Submission, cancellation and completion all go through a single
//! mutex, so a retrigger racing a just-finished run can never leave two live
//! handles for one path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::handle::{InvocationHandle, InvocationId};
use crate::request::InvocationRequest;

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "forge_bridge::registry";

/// Tracks running invocations for one bridge instance.
///
/// # Example
///
/// ```no_run
/// use forge_bridge::{InvocationRegistry, InvocationRequest};
///
/// let registry = InvocationRegistry::new();
/// let request = InvocationRequest::new("/data/input.csv", "dataforge")?;
/// let first = registry.submit(&request);
/// let second = registry.submit(&request);
///
/// assert!(first.is_cancelled());
/// assert!(!second.is_cancelled());
/// assert_eq!(registry.len(), 1);
/// # Ok::<(), forge_bridge::BridgeError>(())
/// ```
#[derive(Debug, Default)]
pub struct InvocationRegistry {
    running: Mutex<HashMap<PathBuf, Arc<InvocationHandle>>>,
    next_id: AtomicU64,
}

impl InvocationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries stay consistent after every operation, so a poisoned lock is
    /// recovered rather than propagated.
    fn running(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<InvocationHandle>>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a new handle for the request's target, cancelling and
    /// replacing any handle already running for that path.
    ///
    /// The registry keeps ownership of the handle; callers should derive a
    /// [`CancelSignal`](crate::CancelSignal) and let the returned `Arc` go.
    pub fn submit(&self, request: &InvocationRequest) -> Arc<InvocationHandle> {
        let id = InvocationId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let path = request.target_path().to_path_buf();
        let handle = Arc::new(InvocationHandle::new(id, path.clone()));

        let mut running = self.running();
        if let Some(previous) = running.insert(path, Arc::clone(&handle)) {
            previous.request_cancel();
            debug!(
                target: REGISTRY_TARGET,
                path = %request.target_path().display(),
                superseded = %previous.id(),
                invocation_id = %id,
                "replaced running invocation"
            );
        } else {
            debug!(
                target: REGISTRY_TARGET,
                path = %request.target_path().display(),
                invocation_id = %id,
                "registered invocation"
            );
        }
        handle
    }

    /// Requests cancellation of the run for `target`.
    ///
    /// Returns `true` only when a running, not yet cancelled handle existed.
    /// Cancelling a path whose run already finished is a no-op returning
    /// `false`.
    pub fn cancel(&self, target: &Path) -> bool {
        let running = self.running();
        let cancelled = running
            .get(target)
            .is_some_and(|handle| handle.request_cancel());
        debug!(
            target: REGISTRY_TARGET,
            path = %target.display(),
            cancelled,
            "cancel requested"
        );
        cancelled
    }

    /// Flags every running handle; returns how many were newly cancelled.
    pub fn cancel_all(&self) -> usize {
        self.running()
            .values()
            .filter(|handle| handle.request_cancel())
            .count()
    }

    /// Returns the handle running for `target`, if any.
    #[must_use]
    pub fn get(&self, target: &Path) -> Option<Arc<InvocationHandle>> {
        self.running().get(target).cloned()
    }

    /// Records that invocation `id` for `target` produced its result.
    ///
    /// Removes the handle when it is still the current one for the path and
    /// returns `true`. Returns `false` when the run had been superseded, in
    /// which case its result must not reach the host.
    pub fn complete(&self, target: &Path, id: InvocationId) -> bool {
        let mut running = self.running();
        let current = running.get(target).is_some_and(|handle| handle.id() == id);
        if current {
            running.remove(target);
        }
        debug!(
            target: REGISTRY_TARGET,
            path = %target.display(),
            invocation_id = %id,
            current,
            "invocation completed"
        );
        current
    }

    /// Paths with a running invocation.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.running().keys().cloned().collect()
    }

    /// Number of running invocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.running().len()
    }

    /// Returns `true` when nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.running().is_empty()
    }
}
