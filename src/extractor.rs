//! # Extractor Module
//!
//! Defines the `Extractor` trait, the caller-supplied capability that knows how
//! to read a listing site.
//!
//! ## Overview
//!
//! The engine never fetches or parses anything itself. For every listing page
//! it asks the extractor which item URLs the page lists and which pages come
//! next, and for every unique item URL it asks the extractor for the item.
//! Transport, parsing, retries and rate-limit negotiation with the remote
//! server all live behind this trait.
//!
//! ## Implementation
//!
//! Implementors must define:
//! - `discover_urls`: item URLs and next-page URLs found on a listing page
//! - `extract`: the item behind an item URL, or `None` if there is none
//!
//! `extract_into` is the channel calling convention. Its default calls
//! `extract` and sends the item to the result sink; override it to stream items
//! straight into the sink instead.
//!
//! Both operations receive the run's cancellation token and are expected to
//! abort their own I/O when it fires.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagewalk_core::{async_trait, CancellationToken, Discovered, Extractor, PagewalkError};
//!
//! struct Listing;
//!
//! #[async_trait]
//! impl Extractor<Product> for Listing {
//!     async fn discover_urls(&self, _token: &CancellationToken, url: &str) -> Result<Discovered, PagewalkError> {
//!         let page = fetch(url).await?;
//!         Ok(Discovered::new(page.product_links(), page.next_links()))
//!     }
//!
//!     async fn extract(&self, _token: &CancellationToken, url: &str) -> Result<Option<Product>, PagewalkError> {
//!         Ok(Some(fetch(url).await?.product()))
//!     }
//! }
//! ```

use crate::error::PagewalkError;
use crate::stats::StatCollector;
use async_trait::async_trait;
use kanal::AsyncSender;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a listing page links to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovered {
    /// URLs of the items listed on the page, in page order.
    pub item_urls: Vec<String>,
    /// URLs of the pages that follow this one.
    pub next_page_urls: Vec<String>,
}

impl Discovered {
    /// Creates a new `Discovered` from item and next-page URLs.
    pub fn new<I, N>(item_urls: I, next_page_urls: N) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            item_urls: item_urls.into_iter().map(Into::into).collect(),
            next_page_urls: next_page_urls.into_iter().map(Into::into).collect(),
        }
    }

    /// A page that lists nothing and leads nowhere.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an item URL.
    pub fn add_item_url(&mut self, url: impl Into<String>) {
        self.item_urls.push(url.into());
    }

    /// Adds a next-page URL.
    pub fn add_next_page(&mut self, url: impl Into<String>) {
        self.next_page_urls.push(url.into());
    }

    /// Checks if the page yielded neither items nor next pages.
    pub fn is_empty(&self) -> bool {
        self.item_urls.is_empty() && self.next_page_urls.is_empty()
    }
}

/// Defines the contract for reading a paginated listing.
#[async_trait]
pub trait Extractor<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    /// Returns the item URLs and next-page URLs found at `url`.
    async fn discover_urls(
        &self,
        token: &CancellationToken,
        url: &str,
    ) -> Result<Discovered, PagewalkError>;

    /// Produces the item behind `url`, or `None` if the page holds no item.
    async fn extract(
        &self,
        token: &CancellationToken,
        url: &str,
    ) -> Result<Option<T>, PagewalkError>;

    /// Produces the item behind `url` and pushes it into `output`.
    async fn extract_into(
        &self,
        token: &CancellationToken,
        url: &str,
        output: &ItemSender<T>,
    ) -> Result<(), PagewalkError> {
        if let Some(item) = self.extract(token, url).await? {
            output.send(item).await?;
        }
        Ok(())
    }
}

/// The input side of the result sink, handed to `Extractor::extract_into`.
pub struct ItemSender<T> {
    tx: AsyncSender<T>,
    token: CancellationToken,
    stats: Arc<StatCollector>,
}

impl<T> ItemSender<T> {
    pub(crate) fn new(tx: AsyncSender<T>, token: CancellationToken, stats: Arc<StatCollector>) -> Self {
        Self { tx, token, stats }
    }

    /// Hands `item` to the result sink.
    ///
    /// Waits until the sink accepts the item. Fails if the run is cancelled
    /// first or the sink has shut down; the item is discarded in both cases.
    pub async fn send(&self, item: T) -> Result<(), PagewalkError> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(PagewalkError::GeneralError(
                "Run cancelled before the item reached the result sink".into(),
            )),
            res = self.tx.send(item) => {
                res.map_err(|e| PagewalkError::GeneralError(format!("Result sink closed: {}", e)))?;
                self.stats.increment_items_extracted();
                Ok(())
            }
        }
    }

    /// Checks if the run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    struct Echo;

    #[async_trait]
    impl Extractor<String> for Echo {
        async fn discover_urls(
            &self,
            _token: &CancellationToken,
            _url: &str,
        ) -> Result<Discovered, PagewalkError> {
            Ok(Discovered::empty())
        }

        async fn extract(
            &self,
            _token: &CancellationToken,
            url: &str,
        ) -> Result<Option<String>, PagewalkError> {
            if url.ends_with("/missing") {
                return Ok(None);
            }
            Ok(Some(url.to_uppercase()))
        }
    }

    #[test]
    fn discovered_builders() {
        let mut discovered = Discovered::new(["a", "b"], Vec::<String>::new());
        assert!(!discovered.is_empty());
        discovered.add_next_page("p2");
        discovered.add_item_url("c");

        assert_eq!(discovered.item_urls, vec!["a", "b", "c"]);
        assert_eq!(discovered.next_page_urls, vec!["p2"]);
        assert!(Discovered::empty().is_empty());
    }

    #[tokio::test]
    async fn default_extract_into_sends_the_item() {
        let (tx, rx) = kanal::bounded_async(1);
        let token = CancellationToken::new();
        let stats = Arc::new(StatCollector::new());
        let sender = ItemSender::new(tx, token.clone(), Arc::clone(&stats));

        Echo.extract_into(&token, "https://x/item", &sender).await.unwrap();
        Echo.extract_into(&token, "https://x/missing", &sender).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), "HTTPS://X/ITEM");
        assert_eq!(rx.len(), 0);
        assert_eq!(stats.items_extracted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_fails_once_cancelled() {
        let (tx, _rx) = kanal::bounded_async::<String>(0);
        let token = CancellationToken::new();
        let sender = ItemSender::new(tx, token.clone(), Arc::new(StatCollector::new()));

        token.cancel();
        assert!(sender.is_cancelled());
        assert!(sender.send("item".into()).await.is_err());
    }
}
