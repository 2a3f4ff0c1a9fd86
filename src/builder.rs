//! # Builder Module
//!
//! Provides the `EngineBuilder`, a fluent API for constructing and configuring
//! `Engine` instances.
//!
//! ## Overview
//!
//! `Engine::new` covers the common case: a list of strategies, a callback and
//! a request delay. The builder exposes the remaining knobs of `EngineConfig`
//! and validates them before an engine is created.
//!
//! ## Key Features
//!
//! - **Concurrency Configuration**: cap concurrent walks and extractions, or
//!   lift the caps entirely
//! - **Throttling**: delay between consecutive extraction launches
//! - **Channels**: capacity of the job queue and the item channel
//! - **Shutdown**: how long a cancelled run waits for outstanding tasks
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagewalk_core::EngineBuilder;
//! use std::time::Duration;
//!
//! let engine = EngineBuilder::new(|product: Product| println!("{product:?}"))
//!     .add_strategy(ShopListing::new(), "https://shop.example/catalog?page=1")
//!     .request_delay(Duration::from_millis(250))
//!     .max_concurrent_extractions(8)
//!     .build()?;
//!
//! let stats = engine.run_until_ctrl_c().await?;
//! println!("{stats}");
//! ```

use crate::engine::{Callback, Engine};
use crate::error::PagewalkError;
use crate::extractor::Extractor;
use crate::strategy::Strategy;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Configuration for a run's throttling, concurrency and shutdown behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pause between launching one extraction and the next. Zero disables throttling.
    pub request_delay: Duration,
    /// The maximum number of pages walked at once; `None` is unbounded.
    pub max_concurrent_walks: Option<usize>,
    /// The maximum number of extractions in flight; `None` is unbounded.
    pub max_concurrent_extractions: Option<usize>,
    /// Capacity of the job queue and the item channel. Zero makes both rendezvous channels.
    pub channel_capacity: usize,
    /// How long a cancelled run waits for outstanding tasks to unwind.
    pub shutdown_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            request_delay: Duration::ZERO,
            max_concurrent_walks: Some(num_cpus::get().max(16)),
            max_concurrent_extractions: Some(num_cpus::get().max(16)),
            channel_capacity: 0,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Checks the configuration for values that would stall a run.
    pub fn validate(&self) -> Result<(), PagewalkError> {
        if self.max_concurrent_walks == Some(0) {
            return Err(PagewalkError::ConfigurationError(
                "max_concurrent_walks must be greater than 0.".to_string(),
            ));
        }
        if self.max_concurrent_extractions == Some(0) {
            return Err(PagewalkError::ConfigurationError(
                "max_concurrent_extractions must be greater than 0.".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct EngineBuilder<T: Send + 'static> {
    config: EngineConfig,
    strategies: Vec<Strategy<T>>,
    callback: Callback<T>,
}

impl<T: Send + 'static> EngineBuilder<T> {
    /// Creates a new `EngineBuilder` delivering items to `callback`.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            config: EngineConfig::default(),
            strategies: Vec::new(),
            callback: Arc::new(callback),
        }
    }

    /// Adds a crawl root walked with `extractor`.
    pub fn add_strategy<E>(mut self, extractor: E, url: impl Into<String>) -> Self
    where
        E: Extractor<T>,
    {
        self.strategies.push(Strategy::new(extractor, url));
        self
    }

    /// Adds a crawl root walked with an extractor shared with other strategies.
    pub fn add_shared_strategy(mut self, extractor: Arc<dyn Extractor<T>>, url: impl Into<String>) -> Self {
        self.strategies.push(Strategy::from_arc(extractor, url));
        self
    }

    /// Adds already constructed strategies.
    pub fn strategies(mut self, strategies: impl IntoIterator<Item = Strategy<T>>) -> Self {
        self.strategies.extend(strategies);
        self
    }

    /// Sets the delay between consecutive extraction launches.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.request_delay = delay;
        self
    }

    /// Sets the maximum number of pages walked concurrently.
    pub fn max_concurrent_walks(mut self, limit: usize) -> Self {
        self.config.max_concurrent_walks = Some(limit);
        self
    }

    /// Sets the maximum number of extractions in flight.
    pub fn max_concurrent_extractions(mut self, limit: usize) -> Self {
        self.config.max_concurrent_extractions = Some(limit);
        self
    }

    /// Removes both concurrency caps: one task per page and per item, with no upper bound.
    pub fn unbounded_concurrency(mut self) -> Self {
        self.config.max_concurrent_walks = None;
        self.config.max_concurrent_extractions = None;
        self
    }

    /// Sets the capacity of the job queue and the item channel.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Sets how long a cancelled run waits for outstanding tasks.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the `Engine`, validating the configuration.
    pub fn build(self) -> Result<Engine<T>, PagewalkError> {
        self.config.validate()?;
        if self.strategies.is_empty() {
            warn!("Engine built without strategies; runs will finish immediately");
        }
        Ok(Engine::from_parts(self.strategies, self.callback, self.config))
    }
}
