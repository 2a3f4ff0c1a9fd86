//! # Walker Module
//!
//! Contains the pagination walker for the engine.
//!
//! ## Overview
//!
//! A walk processes one listing page: it asks the extractor for the page's
//! item URLs and next-page URLs, submits the item URLs to the job queue as a
//! single job, and spawns an independent walk for every next page it manages
//! to claim.
//!
//! ## Claim-before-spawn
//!
//! A page URL is claimed in the visited-pages set before the walk that will
//! process it is spawned: seed URLs by `Walker::start`, next pages by their
//! parent walk. A walk therefore never re-checks its own URL, and a page that
//! links back to itself or to an already claimed page is pruned at the claim
//! instead of after a full recursive call. Over a finite page graph, cycles
//! and diamonds included, every reachable page is walked exactly once.
//!
//! ## Work accounting
//!
//! Every unit of work is registered with the `CompletionTracker` before the
//! work is handed off: the job registers one unit per item URL plus one for its
//! submission, and each child walk gets its own unit. A walk's own unit is
//! released when the walk finishes, after all of that has happened.

use crate::completion::{CompletionTracker, WorkGuard};
use crate::concurrency::ConcurrencyLimit;
use crate::extractor::{Discovered, Extractor};
use crate::stats::StatCollector;
use crate::strategy::{Job, Strategy};
use crate::visited::VisitedSet;
use futures_util::future::BoxFuture;
use kanal::AsyncSender;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Shared state of all walks belonging to one run.
pub(crate) struct Walker<T: Send + 'static> {
    visited: Arc<VisitedSet>,
    tracker: Arc<CompletionTracker>,
    job_tx: AsyncSender<Job<T>>,
    limit: ConcurrencyLimit,
    token: CancellationToken,
    stats: Arc<StatCollector>,
}

impl<T: Send + 'static> Walker<T> {
    pub(crate) fn new(
        visited: Arc<VisitedSet>,
        tracker: Arc<CompletionTracker>,
        job_tx: AsyncSender<Job<T>>,
        limit: ConcurrencyLimit,
        token: CancellationToken,
        stats: Arc<StatCollector>,
    ) -> Arc<Self> {
        Arc::new(Self {
            visited,
            tracker,
            job_tx,
            limit,
            token,
            stats,
        })
    }

    /// Claims every seed URL, registers one unit per claimed seed, and only
    /// then spawns the walks. Returns the number of walks started.
    ///
    /// A seed that is already claimed, e.g. because two strategies start from
    /// the same URL, is skipped.
    pub(crate) fn start_all(self: &Arc<Self>, strategies: &[Strategy<T>]) -> usize {
        let mut claimed = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            if self.visited.try_claim(strategy.url()) {
                claimed.push(strategy);
            } else {
                debug!("Seed already claimed by another strategy, skipping: {}", strategy.url());
                self.stats.increment_pages_pruned();
            }
        }

        let units = self.tracker.register_many(claimed.len());
        let started = claimed.len();
        for (strategy, unit) in claimed.into_iter().zip(units) {
            debug!("Started walk from seed: {}", strategy.url());
            self.spawn_walk(Arc::clone(strategy.extractor()), strategy.url().to_owned(), unit);
        }
        started
    }

    fn spawn_walk(self: &Arc<Self>, extractor: Arc<dyn Extractor<T>>, url: String, unit: WorkGuard) {
        tokio::spawn(Arc::clone(self).walk(extractor, url, unit));
    }

    fn walk(
        self: Arc<Self>,
        extractor: Arc<dyn Extractor<T>>,
        url: String,
        unit: WorkGuard,
    ) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _unit = unit;

            let Some(permit) = self.limit.acquire(&self.token).await else {
                trace!("Walk cancelled before it started: {}", url);
                return;
            };

            debug!("Walking page: {}", url);
            let discovered = tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    trace!("Walk cancelled during discovery: {}", url);
                    return;
                }
                result = extractor.discover_urls(&self.token, &url) => match result {
                    Ok(discovered) => discovered,
                    Err(e) => {
                        warn!("URL discovery failed for {}: {}", url, e);
                        self.stats.increment_discovery_failures();
                        Discovered::empty()
                    }
                },
            };
            self.stats.increment_pages_walked();

            let Discovered {
                item_urls,
                next_page_urls,
            } = discovered;
            trace!(
                "Page {} listed {} item(s) and {} next page(s)",
                url,
                item_urls.len(),
                next_page_urls.len()
            );

            if !item_urls.is_empty() {
                let job = Job::new(Arc::clone(&extractor), item_urls, &self.tracker);
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {
                        trace!("Walk cancelled before its job was queued: {}", url);
                        return;
                    }
                    sent = self.job_tx.send(job) => {
                        if let Err(e) = sent {
                            warn!("Job queue closed, dropping items listed on {}: {}", url, e);
                        }
                    }
                }
            }
            drop(permit);

            for next in next_page_urls {
                if self.token.is_cancelled() {
                    debug!("Cancellation observed, not following further pages from {}", url);
                    break;
                }
                if !self.visited.try_claim(&next) {
                    trace!("Page already claimed, pruning: {}", next);
                    self.stats.increment_pages_pruned();
                    continue;
                }
                let unit = self.tracker.register();
                self.spawn_walk(Arc::clone(&extractor), next, unit);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::SiteMap;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct Harness {
        walker: Arc<Walker<String>>,
        tracker: Arc<CompletionTracker>,
        visited: Arc<VisitedSet>,
        stats: Arc<StatCollector>,
        token: CancellationToken,
        jobs: kanal::AsyncReceiver<Job<String>>,
    }

    fn harness() -> Harness {
        let visited = VisitedSet::new();
        let tracker = CompletionTracker::new();
        let stats = Arc::new(StatCollector::new());
        let token = CancellationToken::new();
        let (job_tx, jobs) = kanal::bounded_async(64);
        let walker = Walker::new(
            Arc::clone(&visited),
            Arc::clone(&tracker),
            job_tx,
            ConcurrencyLimit::unbounded(),
            token.clone(),
            Arc::clone(&stats),
        );
        Harness {
            walker,
            tracker,
            visited,
            stats,
            token,
            jobs,
        }
    }

    /// Drains the job queue, collecting item URLs, until every walk has finished.
    async fn collect_item_urls(h: &Harness) -> Vec<String> {
        let mut urls = Vec::new();
        let done = h.tracker.wait();
        tokio::pin!(done);
        loop {
            tokio::select! {
                _ = &mut done => break,
                job = h.jobs.recv() => {
                    let job = job.unwrap();
                    urls.extend(job.urls().iter().cloned());
                }
            }
        }
        urls
    }

    #[tokio::test]
    async fn cycle_is_walked_once_per_page() {
        let site = Arc::new(
            SiteMap::new()
                .page("p1", &["a"], &["p2", "p3"])
                .page("p2", &["b"], &["p3", "p1"])
                .page("p3", &["c"], &["p1", "p2", "p3"]),
        );
        let h = harness();
        let strategy = Strategy::from_arc(Arc::clone(&site) as Arc<dyn Extractor<String>>, "p1");

        assert_eq!(h.walker.start_all(&[strategy]), 1);
        let mut urls = tokio::time::timeout(Duration::from_secs(5), collect_item_urls(&h))
            .await
            .expect("walk over a cyclic graph must terminate");
        urls.sort();

        assert_eq!(urls, ["a", "b", "c"]);
        for page in ["p1", "p2", "p3"] {
            assert_eq!(site.discover_count(page), 1, "{} walked more than once", page);
        }
        assert_eq!(h.visited.len(), 3);
        assert_eq!(h.stats.pages_walked.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn self_loop_terminates() {
        let site = Arc::new(SiteMap::new().page("loop", &["x"], &["loop"]));
        let h = harness();
        let strategy = Strategy::from_arc(Arc::clone(&site) as Arc<dyn Extractor<String>>, "loop");

        h.walker.start_all(&[strategy]);
        let urls = tokio::time::timeout(Duration::from_secs(5), collect_item_urls(&h))
            .await
            .expect("self-loop must terminate");

        assert_eq!(urls, ["x"]);
        assert_eq!(site.discover_count("loop"), 1);
        assert_eq!(h.stats.pages_pruned.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_seed_is_not_started_twice() {
        let site = Arc::new(SiteMap::new().page("seed", &[], &[]));
        let h = harness();
        let strategy = Strategy::from_arc(Arc::clone(&site) as Arc<dyn Extractor<String>>, "seed");

        assert_eq!(h.walker.start_all(&[strategy.clone(), strategy]), 1);
        tokio::time::timeout(Duration::from_secs(5), h.tracker.wait())
            .await
            .unwrap();
        assert_eq!(site.discover_count("seed"), 1);
    }

    #[tokio::test]
    async fn discovery_failure_counts_as_an_empty_page() {
        let site = Arc::new(SiteMap::new().broken_page("seed"));
        let h = harness();
        let strategy = Strategy::from_arc(Arc::clone(&site) as Arc<dyn Extractor<String>>, "seed");

        h.walker.start_all(&[strategy]);
        tokio::time::timeout(Duration::from_secs(5), h.tracker.wait())
            .await
            .expect("a failed page must still release its unit");
        assert_eq!(h.stats.discovery_failures.load(Ordering::SeqCst), 1);
        assert!(h.jobs.is_empty());
    }

    #[tokio::test]
    async fn cancelled_walk_releases_its_unit() {
        let site = Arc::new(SiteMap::new().page("seed", &["a"], &["p2"]));
        let h = harness();
        let strategy = Strategy::from_arc(Arc::clone(&site) as Arc<dyn Extractor<String>>, "seed");

        h.token.cancel();
        h.walker.start_all(&[strategy]);
        tokio::time::timeout(Duration::from_secs(5), h.tracker.wait())
            .await
            .expect("cancelled walk must release its unit");
        assert_eq!(site.discover_count("seed"), 0);
        assert!(!h.visited.contains("p2"));
    }

    /// Records the outstanding work seen by the first discovery call.
    struct FirstDiscovery {
        tracker: Arc<CompletionTracker>,
        pending: std::sync::Mutex<Option<usize>>,
    }

    #[async_trait::async_trait]
    impl Extractor<String> for FirstDiscovery {
        async fn discover_urls(
            &self,
            _token: &CancellationToken,
            _url: &str,
        ) -> Result<Discovered, crate::error::PagewalkError> {
            let pending = self.tracker.pending();
            self.pending.lock().unwrap().get_or_insert(pending);
            Ok(Discovered::empty())
        }

        async fn extract(
            &self,
            _token: &CancellationToken,
            _url: &str,
        ) -> Result<Option<String>, crate::error::PagewalkError> {
            Ok(None)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_seed_is_registered_before_any_walk_runs() {
        let h = harness();
        let extractor = Arc::new(FirstDiscovery {
            tracker: Arc::clone(&h.tracker),
            pending: std::sync::Mutex::new(None),
        });
        let seeds: Vec<_> = ["s1", "s2", "s3", "s4", "s5"]
            .into_iter()
            .map(|url| Strategy::from_arc(Arc::clone(&extractor) as Arc<dyn Extractor<String>>, url))
            .collect();

        assert_eq!(h.walker.start_all(&seeds), 5);
        tokio::time::timeout(Duration::from_secs(5), h.tracker.wait())
            .await
            .unwrap();

        assert_eq!(*extractor.pending.lock().unwrap(), Some(5));
    }
}
