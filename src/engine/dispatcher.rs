//! Contains the job dispatch logic for the engine.
//!
//! This module implements the consumer side of the job queue. It handles:
//!
//! - Receiving jobs submitted by the pagination walker
//! - Claiming each item URL in the extracted set, so an item listed on many
//!   pages is extracted once
//! - Launching one extraction task per claimed URL, within the configured limit
//! - Throttling launches with the configured request delay
//! - Releasing the work units of skipped URLs and of the job itself
//!
//! The main entry point is `spawn_job_dispatcher`, which creates the task that
//! drains the job queue until it is closed or the run is cancelled.

use crate::completion::WorkGuard;
use crate::concurrency::{ConcurrencyLimit, SpawnPermit};
use crate::extractor::{Extractor, ItemSender};
use crate::stats::StatCollector;
use crate::strategy::Job;
use crate::visited::VisitedSet;
use kanal::{AsyncReceiver, AsyncSender};
use log::{debug, error, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[allow(clippy::too_many_arguments)]
pub(crate) fn spawn_job_dispatcher<T>(
    job_rx: AsyncReceiver<Job<T>>,
    item_tx: AsyncSender<T>,
    extracted: Arc<VisitedSet>,
    limit: ConcurrencyLimit,
    request_delay: Duration,
    token: CancellationToken,
    stats: Arc<StatCollector>,
) -> tokio::task::JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        let mut tasks = JoinSet::new();

        trace!(
            "Starting job dispatcher with request_delay: {:?}, extraction limit: {:?}",
            request_delay,
            limit.limit()
        );
        'jobs: loop {
            let job = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Cancellation requested, job dispatcher stopping");
                    break 'jobs;
                }
                received = job_rx.recv() => match received {
                    Ok(job) => job,
                    Err(_) => {
                        debug!("Job queue closed, job dispatcher stopping");
                        break 'jobs;
                    }
                },
            };

            stats.increment_jobs_dispatched();
            debug!("Dispatching job with {} item URL(s)", job.len());
            trace!("Job item URLs: {:?}", job.urls());
            let (extractor, items, _submission) = job.into_parts();

            for (url, unit) in items {
                if token.is_cancelled() {
                    break 'jobs;
                }
                if !extracted.try_claim(&url) {
                    trace!("Item already claimed for extraction, skipping: {}", url);
                    stats.increment_items_skipped();
                    continue;
                }
                stats.increment_items_claimed();

                let Some(permit) = limit.acquire(&token).await else {
                    break 'jobs;
                };

                let output = ItemSender::new(item_tx.clone(), token.clone(), Arc::clone(&stats));
                tasks.spawn(extract_item(
                    Arc::clone(&extractor),
                    url,
                    output,
                    token.clone(),
                    Arc::clone(&stats),
                    unit,
                    permit,
                ));

                while let Some(res) = tasks.try_join_next() {
                    if let Err(e) = res {
                        error!("An extraction task failed: {:?}", e);
                    }
                }

                if !request_delay.is_zero() {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => break 'jobs,
                        _ = tokio::time::sleep(request_delay) => {}
                    }
                }
            }
        }

        drop(item_tx);
        trace!("Waiting for {} active extraction task(s) to complete", tasks.len());
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("An extraction task failed: {:?}", e);
            }
        }
        trace!("Job dispatcher finished");
    })
}

async fn extract_item<T>(
    extractor: Arc<dyn Extractor<T>>,
    url: String,
    output: ItemSender<T>,
    token: CancellationToken,
    stats: Arc<StatCollector>,
    unit: WorkGuard,
    permit: SpawnPermit,
) where
    T: Send + 'static,
{
    let _unit = unit;
    let _permit = permit;

    trace!("Extracting item: {}", url);
    let result = tokio::select! {
        biased;
        _ = token.cancelled() => {
            trace!("Extraction cancelled: {}", url);
            return;
        }
        result = extractor.extract_into(&token, &url, &output) => result,
    };

    match result {
        Ok(()) => trace!("Extraction finished: {}", url),
        Err(_) if token.is_cancelled() => trace!("Extraction cancelled: {}", url),
        Err(e) => {
            warn!("Extraction failed for {}: {}", url, e);
            stats.increment_extraction_failures();
        }
    }
}
