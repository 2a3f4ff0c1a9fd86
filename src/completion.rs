//! Module for tracking outstanding work during a run.
//!
//! This module defines the `CompletionTracker`, a counted work-unit primitive
//! that decides when a run is finished. The orchestrator adds one unit per seed
//! strategy; every walk registers units for the work it creates (one per item
//! URL, one for the job submission, one per child walk) before creating it.
//! A unit is released exactly once, when the work it stands for has finished.
//!
//! `WorkGuard` ties a unit to a value's lifetime: the unit is released when the
//! guard is dropped, whichever path the owning task takes (success, failure,
//! cancellation or an early return).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::{trace, warn};

/// Counts outstanding walks and extractions and wakes waiters when it reaches zero.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    pending: AtomicUsize,
    idle: Notify,
}

impl CompletionTracker {
    /// Creates a new, atomically reference-counted `CompletionTracker`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `n` units of outstanding work.
    pub fn add(&self, n: usize) {
        let before = self.pending.fetch_add(n, Ordering::SeqCst);
        trace!("Registered {} work units ({} outstanding)", n, before + n);
    }

    /// Releases one unit of work.
    pub fn done(&self) {
        match self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => {
                trace!("All work units released");
                self.idle.notify_waiters();
            }
            Ok(_) => {}
            Err(_) => warn!("Work unit released with no outstanding work; ignoring"),
        }
    }

    /// Registers one unit of work and returns a guard that releases it on drop.
    pub fn register(self: &Arc<Self>) -> WorkGuard {
        self.add(1);
        WorkGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Registers `n` units at once, returning one guard per unit.
    pub fn register_many(self: &Arc<Self>, n: usize) -> Vec<WorkGuard> {
        self.add(n);
        (0..n)
            .map(|_| WorkGuard {
                tracker: Arc::clone(self),
            })
            .collect()
    }

    /// Returns the number of outstanding work units.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Checks if no work is outstanding.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Waits until every registered unit has been released.
    ///
    /// Resolves immediately if nothing is outstanding.
    pub async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a release in between is not lost.
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

/// One registered unit of work, released when dropped.
#[derive(Debug)]
#[must_use = "dropping a WorkGuard immediately releases its work unit"]
pub struct WorkGuard {
    tracker: Arc<CompletionTracker>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
