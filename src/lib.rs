//! # pagewalk-core
//!
//! Concurrent engine for walking paginated listings and delivering every
//! listed item exactly once.
//!
//! Provides the main components: `Engine`, `EngineBuilder`, the `Extractor`
//! trait, and the deduplication and completion infrastructure behind them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagewalk_core::{async_trait, CancellationToken, Discovered, Engine, Extractor, PagewalkError, Strategy};
//! use std::time::Duration;
//!
//! struct Catalog;
//!
//! #[async_trait]
//! impl Extractor<String> for Catalog {
//!     async fn discover_urls(&self, _token: &CancellationToken, url: &str) -> Result<Discovered, PagewalkError> {
//!         todo!()
//!     }
//!
//!     async fn extract(&self, _token: &CancellationToken, url: &str) -> Result<Option<String>, PagewalkError> {
//!         todo!()
//!     }
//! }
//!
//! async fn run_catalog() -> Result<(), PagewalkError> {
//!     let engine = Engine::new(
//!         vec![Strategy::new(Catalog, "https://shop.example/catalog?page=1")],
//!         |title: String| println!("{title}"),
//!         Duration::from_millis(250),
//!     );
//!     let stats = engine.run(CancellationToken::new()).await?;
//!     println!("{stats}");
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod completion;
pub mod concurrency;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod prelude;
pub mod stats;
pub mod strategy;
pub mod visited;

pub use builder::{EngineBuilder, EngineConfig};
pub use completion::{CompletionTracker, WorkGuard};
pub use concurrency::ConcurrencyLimit;
pub use engine::{Callback, Engine};
pub use error::PagewalkError;
pub use extractor::{Discovered, Extractor, ItemSender};
pub use stats::{StatCollector, StatsSnapshot};
pub use strategy::Strategy;
pub use visited::VisitedSet;

pub use async_trait::async_trait;
pub use tokio;
pub use tokio_util::sync::CancellationToken;
