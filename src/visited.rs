//! # Visited Module
//!
//! Tracks which URLs have been claimed for processing.
//!
//! ## Overview
//!
//! A `VisitedSet` is the deduplication guard of the engine. Both the pagination
//! walker and the extraction dispatcher fan out into many concurrently running
//! tasks, so membership is checked and recorded in a single atomic step:
//! `try_claim` returns `true` for exactly one caller per URL, no matter how many
//! tasks race on it.
//!
//! The engine keeps two independent sets per run: one for pages claimed for
//! walking and one for item URLs claimed for extraction. A URL that is both a
//! listing page and an item is therefore walked once and extracted once.

use dashmap::DashSet;
use std::sync::Arc;

/// A concurrency-safe set of claimed URLs.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: DashSet<String>,
}

impl VisitedSet {
    /// Creates a new, atomically reference-counted `VisitedSet`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims `url` for the caller.
    ///
    /// Returns `true` and records membership if and only if the URL was not
    /// already a member. The check and the insert happen under one shard lock.
    pub fn try_claim(&self, url: &str) -> bool {
        self.urls.insert(url.to_owned())
    }

    /// Checks whether `url` has already been claimed.
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns the number of claimed URLs.
    #[inline]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Checks if nothing has been claimed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn claims_each_url_once() {
        let visited = VisitedSet::new();

        assert!(visited.try_claim("https://example.com/page/1"));
        assert!(!visited.try_claim("https://example.com/page/1"));
        assert!(visited.try_claim("https://example.com/page/2"));

        assert!(visited.contains("https://example.com/page/1"));
        assert!(!visited.contains("https://example.com/page/3"));
        assert_eq!(visited.len(), 2);
    }

    #[test]
    fn starts_empty() {
        let visited = VisitedSet::new();
        assert!(visited.is_empty());
        assert_eq!(visited.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_claims_on_one_url_have_a_single_winner() {
        let visited = VisitedSet::new();
        let winners = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..256 {
            let visited = Arc::clone(&visited);
            let winners = Arc::clone(&winners);
            handles.push(tokio::spawn(async move {
                if visited.try_claim("https://example.com/item/42") {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn losing_claim_leaves_the_set_unchanged() {
        let visited = VisitedSet::new();
        assert!(visited.try_claim("https://example.com/page/1"));
        for _ in 0..3 {
            assert!(!visited.try_claim("https://example.com/page/1"));
        }
        assert_eq!(visited.len(), 1);
    }
}
