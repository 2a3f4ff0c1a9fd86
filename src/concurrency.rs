//! Concurrency limiting for walk and extraction tasks.
//!
//! Every walk and every extraction runs as its own tokio task. A
//! `ConcurrencyLimit` caps how many of them hold a permit at once. A limit of
//! `None` keeps the unbounded one-task-per-URL model; any `Some(n)` routes the
//! same spawns through a semaphore with `n` permits. Claims are always taken
//! before a permit is requested, so the limit never changes which URLs get
//! processed, only how many are in flight.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// An optional cap on the number of concurrently running tasks of one kind.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimit {
    limit: Option<usize>,
    semaphore: Option<Arc<Semaphore>>,
}

/// Proof that a task may run. Dropping it frees the slot.
#[derive(Debug)]
pub struct SpawnPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl ConcurrencyLimit {
    /// Creates a limit with `limit` permits, or an unbounded one for `None`.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            semaphore: limit.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Creates a limit that never makes a task wait.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Returns the configured number of permits, if bounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns the number of currently free permits, if bounded.
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Waits for a free slot.
    ///
    /// Returns `None` if `token` is cancelled before a slot frees up.
    pub async fn acquire(&self, token: &CancellationToken) -> Option<SpawnPermit> {
        let Some(semaphore) = &self.semaphore else {
            return Some(SpawnPermit { _permit: None });
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => None,
            permit = Arc::clone(semaphore).acquire_owned() => {
                permit.ok().map(|p| SpawnPermit { _permit: Some(p) })
            }
        }
    }
}

impl Default for ConcurrencyLimit {
    fn default() -> Self {
        Self::new(Some(num_cpus::get().max(16)))
    }
}
