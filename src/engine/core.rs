//! The core Engine implementation for `pagewalk-core`.
//!
//! This module defines the `Engine` struct, the orchestrator of a run. It
//! creates the per-run state (visited sets, completion tracker, statistics),
//! spawns the result sink and the job dispatcher, starts one walk per seed
//! strategy, and then runs the shutdown protocol: wait until the completion
//! tracker reaches zero (or the run is cancelled), then let the job queue and
//! the item channel close, then join the dispatcher and the sink.

use super::sink::Callback;
use super::{Walker, spawn_job_dispatcher, spawn_result_sink};
use crate::builder::{EngineBuilder, EngineConfig};
use crate::completion::CompletionTracker;
use crate::concurrency::ConcurrencyLimit;
use crate::error::PagewalkError;
use crate::stats::StatCollector;
use crate::strategy::{Job, Strategy};
use crate::visited::VisitedSet;
use kanal::bounded_async;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Walks every strategy's pagination graph and delivers each unique item once.
pub struct Engine<T: Send + 'static> {
    strategies: Vec<Strategy<T>>,
    callback: Callback<T>,
    config: EngineConfig,
}

impl<T: Send + 'static> Engine<T> {
    /// Creates a new `Engine` with default concurrency settings.
    pub fn new<F>(strategies: Vec<Strategy<T>>, callback: F, request_delay: Duration) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let config = EngineConfig {
            request_delay,
            ..EngineConfig::default()
        };
        Self::from_parts(strategies, Arc::new(callback), config)
    }

    /// Returns an `EngineBuilder` delivering items to `callback`.
    pub fn builder<F>(callback: F) -> EngineBuilder<T>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        EngineBuilder::new(callback)
    }

    pub(crate) fn from_parts(
        strategies: Vec<Strategy<T>>,
        callback: Callback<T>,
        config: EngineConfig,
    ) -> Self {
        Engine {
            strategies,
            callback,
            config,
        }
    }

    /// The crawl roots walked by every run.
    pub fn strategies(&self) -> &[Strategy<T>] {
        &self.strategies
    }

    /// The configuration used by every run.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the engine until all reachable pages are walked and all discovered
    /// items are delivered, or until `token` is cancelled.
    ///
    /// Each call starts from empty visited sets. Per-URL failures are logged
    /// and counted but never fail the run; the returned statistics describe
    /// what happened. An error is returned only if the dispatcher or the sink
    /// task itself fails, e.g. because the callback panicked.
    pub async fn run(&self, token: CancellationToken) -> Result<Arc<StatCollector>, PagewalkError> {
        let config = &self.config;
        info!(
            "Engine starting run with {} strategies: request_delay={:?}, max_concurrent_walks={:?}, max_concurrent_extractions={:?}, channel_capacity={}",
            self.strategies.len(),
            config.request_delay,
            config.max_concurrent_walks,
            config.max_concurrent_extractions,
            config.channel_capacity
        );

        let stats = Arc::new(StatCollector::new());
        let tracker = CompletionTracker::new();

        trace!("Creating job queue and item channel with capacity: {}", config.channel_capacity);
        let (job_tx, job_rx) = bounded_async::<Job<T>>(config.channel_capacity);
        let (item_tx, item_rx) = bounded_async::<T>(config.channel_capacity);

        trace!("Spawning result sink");
        let sink_task = spawn_result_sink(
            item_rx,
            Arc::clone(&self.callback),
            token.clone(),
            Arc::clone(&stats),
        );

        trace!("Spawning job dispatcher");
        let dispatcher_task = spawn_job_dispatcher(
            job_rx,
            item_tx,
            VisitedSet::new(),
            ConcurrencyLimit::new(config.max_concurrent_extractions),
            config.request_delay,
            token.clone(),
            Arc::clone(&stats),
        );

        let walker = Walker::new(
            VisitedSet::new(),
            Arc::clone(&tracker),
            job_tx,
            ConcurrencyLimit::new(config.max_concurrent_walks),
            token.clone(),
            Arc::clone(&stats),
        );
        let started = walker.start_all(&self.strategies);
        debug!("Started {} walk(s) from {} strategies", started, self.strategies.len());
        // Running walks hold their own handles; the job queue closes when the last one ends.
        drop(walker);

        let cancelled = tokio::select! {
            _ = tracker.wait() => {
                info!("All pages walked and items extracted, initiating shutdown.");
                false
            }
            _ = token.cancelled() => {
                info!("Cancellation requested, initiating shutdown.");
                true
            }
        };

        let joined = async {
            if cancelled
                && tokio::time::timeout(config.shutdown_timeout, tracker.wait())
                    .await
                    .is_err()
            {
                warn!(
                    "{} work unit(s) still outstanding after {:?}, abandoning them",
                    tracker.pending(),
                    config.shutdown_timeout
                );
            }
            (dispatcher_task.await, sink_task.await)
        };

        let (dispatcher_result, sink_result) = if cancelled {
            match tokio::time::timeout(config.shutdown_timeout.saturating_mul(2), joined).await {
                Ok(results) => results,
                Err(_) => {
                    warn!("Dispatcher and result sink did not stop in time, continuing with shutdown");
                    return Ok(stats);
                }
            }
        } else {
            joined.await
        };

        if let Err(e) = dispatcher_result {
            error!("Job dispatcher failed: {}", e);
            return Err(e.into());
        }
        if let Err(e) = sink_result {
            error!("Result sink failed: {}", e);
            return Err(e.into());
        }

        info!(
            "Run finished. Stats: pages_walked={}, items_extracted={}, items_delivered={}",
            stats.pages_walked.load(Ordering::SeqCst),
            stats.items_extracted.load(Ordering::SeqCst),
            stats.items_delivered.load(Ordering::SeqCst)
        );
        Ok(stats)
    }

    /// Runs the engine, cancelling the run when Ctrl-C is received.
    pub async fn run_until_ctrl_c(&self) -> Result<Arc<StatCollector>, PagewalkError> {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, initiating graceful shutdown.");
                signal_token.cancel();
            }
        });

        let result = self.run(token).await;
        signal_task.abort();
        result
    }
}
