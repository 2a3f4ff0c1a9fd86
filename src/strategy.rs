//! Crawl roots and the work batches derived from them.
//!
//! A `Strategy` pairs an extractor with the seed URL it starts from; the
//! engine walks one pagination graph per strategy. A `Job` is what the walker
//! hands to the extraction dispatcher: the item URLs a single listing page
//! produced, together with the work units registered for them.

use crate::completion::{CompletionTracker, WorkGuard};
use crate::extractor::Extractor;
use std::fmt;
use std::sync::Arc;

/// A seed URL plus the extractor that understands it.
pub struct Strategy<T: Send + 'static> {
    extractor: Arc<dyn Extractor<T>>,
    url: String,
}

impl<T: Send + 'static> Strategy<T> {
    /// Creates a new `Strategy` starting at `url`.
    pub fn new<E>(extractor: E, url: impl Into<String>) -> Self
    where
        E: Extractor<T>,
    {
        Self::from_arc(Arc::new(extractor), url)
    }

    /// Creates a new `Strategy` from an already shared extractor.
    pub fn from_arc(extractor: Arc<dyn Extractor<T>>, url: impl Into<String>) -> Self {
        Self {
            extractor,
            url: url.into(),
        }
    }

    /// The seed URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The extractor used for every page reached from this seed.
    pub fn extractor(&self) -> &Arc<dyn Extractor<T>> {
        &self.extractor
    }
}

impl<T: Send + 'static> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            url: self.url.clone(),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Strategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy").field("url", &self.url).finish_non_exhaustive()
    }
}

/// The item URLs of one listing page, bundled for extraction.
pub(crate) struct Job<T: Send + 'static> {
    extractor: Arc<dyn Extractor<T>>,
    urls: Vec<String>,
    units: Vec<WorkGuard>,
    submission: WorkGuard,
}

impl<T: Send + 'static> Job<T> {
    /// Creates a job and registers one work unit per URL plus one for the job itself.
    pub(crate) fn new(
        extractor: Arc<dyn Extractor<T>>,
        urls: Vec<String>,
        tracker: &Arc<CompletionTracker>,
    ) -> Self {
        let units = tracker.register_many(urls.len());
        let submission = tracker.register();
        Self {
            extractor,
            urls,
            units,
            submission,
        }
    }

    /// The item URLs, in page order.
    pub(crate) fn urls(&self) -> &[String] {
        &self.urls
    }

    /// The number of item URLs in the job.
    pub(crate) fn len(&self) -> usize {
        self.urls.len()
    }

    /// Splits the job into its extractor, one (URL, unit) pair per item, and
    /// the unit for the submission, which is released once the job is dispatched.
    pub(crate) fn into_parts(self) -> (Arc<dyn Extractor<T>>, Vec<(String, WorkGuard)>, WorkGuard) {
        let items = self.urls.into_iter().zip(self.units).collect();
        (self.extractor, items, self.submission)
    }
}

impl<T: Send + 'static> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("urls", &self.urls).finish_non_exhaustive()
    }
}
