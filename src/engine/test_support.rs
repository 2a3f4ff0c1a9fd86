//! In-memory listing sites for engine tests.

use crate::error::PagewalkError;
use crate::extractor::{Discovered, Extractor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A fake site: a map from page URL to (item URLs, next-page URLs).
#[derive(Default)]
pub(crate) struct SiteMap {
    pages: HashMap<String, Discovered>,
    broken_pages: HashSet<String>,
    broken_items: HashSet<String>,
    extract_delay: Option<Duration>,
    pub(crate) discover_calls: Mutex<HashMap<String, usize>>,
    pub(crate) extract_calls: Mutex<HashMap<String, usize>>,
    pub(crate) extract_started: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl SiteMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, items: &[&str], next: &[&str]) -> Self {
        self.pages
            .insert(url.to_string(), Discovered::new(items.iter().copied(), next.iter().copied()));
        self
    }

    pub(crate) fn broken_page(mut self, url: &str) -> Self {
        self.broken_pages.insert(url.to_string());
        self
    }

    pub(crate) fn broken_item(mut self, url: &str) -> Self {
        self.broken_items.insert(url.to_string());
        self
    }

    pub(crate) fn extract_delay(mut self, delay: Duration) -> Self {
        self.extract_delay = Some(delay);
        self
    }

    pub(crate) fn discover_count(&self, url: &str) -> usize {
        self.discover_calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn extract_count(&self, url: &str) -> usize {
        self.extract_calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Extractor<String> for SiteMap {
    async fn discover_urls(
        &self,
        _token: &CancellationToken,
        url: &str,
    ) -> Result<Discovered, PagewalkError> {
        *self.discover_calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        if self.broken_pages.contains(url) {
            return Err(PagewalkError::extractor(format!("{} returned 500", url)));
        }
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }

    async fn extract(
        &self,
        _token: &CancellationToken,
        url: &str,
    ) -> Result<Option<String>, PagewalkError> {
        *self.extract_calls.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        self.extract_started.lock().unwrap().push((url.to_string(), Instant::now()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.extract_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken_items.contains(url) {
            return Err(PagewalkError::extractor(format!("{} has no product data", url)));
        }
        Ok(Some(format!("item:{}", url)))
    }
}

/// Pages `page/0`, `page/1`, ... forever, each listing one item.
pub(crate) struct EndlessListing;

#[async_trait]
impl Extractor<String> for EndlessListing {
    async fn discover_urls(
        &self,
        _token: &CancellationToken,
        url: &str,
    ) -> Result<Discovered, PagewalkError> {
        let n: u64 = url
            .rsplit('/')
            .next()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok(Discovered::new(
            [format!("item/{}", n)],
            [format!("page/{}", n + 1)],
        ))
    }

    async fn extract(
        &self,
        _token: &CancellationToken,
        url: &str,
    ) -> Result<Option<String>, PagewalkError> {
        Ok(Some(url.to_string()))
    }
}

/// Lists items whose extraction never finishes and ignores the token.
pub(crate) struct StuckExtraction;

#[async_trait]
impl Extractor<String> for StuckExtraction {
    async fn discover_urls(
        &self,
        _token: &CancellationToken,
        _url: &str,
    ) -> Result<Discovered, PagewalkError> {
        Ok(Discovered::new(["slow/1", "slow/2"], Vec::<String>::new()))
    }

    async fn extract(
        &self,
        _token: &CancellationToken,
        _url: &str,
    ) -> Result<Option<String>, PagewalkError> {
        std::future::pending::<()>().await;
        Ok(None)
    }
}
