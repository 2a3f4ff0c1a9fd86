//! # Statistics Module
//!
//! Collects and reports counters for a single run.
//!
//! ## Overview
//!
//! A fresh `StatCollector` is created at the start of every `Engine::run` and
//! returned when the run finishes. All counters are atomics, so walk,
//! dispatch, extraction and sink tasks update them without locking.
//!
//! ## Key Metrics Tracked
//!
//! - **Pages**: walked, pruned because already claimed, discovery failures
//! - **Jobs**: jobs taken off the job queue by the dispatcher
//! - **Items**: claimed, skipped as duplicates, extracted, failed, delivered
//! - **Timing**: elapsed time since the run started
//!
//! ## Reporting
//!
//! A collector renders as a compact text summary (`Display`), as Markdown
//! (`to_markdown_string`) and as JSON (`to_json_string`).

use crate::error::PagewalkError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// A point-in-time copy of the counters, used for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pages_walked: usize,
    pub pages_pruned: usize,
    pub discovery_failures: usize,
    pub jobs_dispatched: usize,
    pub items_claimed: usize,
    pub items_skipped: usize,
    pub items_extracted: usize,
    pub extraction_failures: usize,
    pub items_delivered: usize,
    pub elapsed_duration: Duration,
}

impl StatsSnapshot {
    fn formatted_duration(&self) -> String {
        let secs = self.elapsed_duration.as_secs();
        if secs >= 60 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{:.2}s", self.elapsed_duration.as_secs_f64())
        }
    }

    fn pages_per_second(&self) -> f64 {
        let secs = self.elapsed_duration.as_secs_f64();
        if secs > 0.0 {
            self.pages_walked as f64 / secs
        } else {
            0.0
        }
    }

    fn items_per_second(&self) -> f64 {
        let secs = self.elapsed_duration.as_secs_f64();
        if secs > 0.0 {
            self.items_delivered as f64 / secs
        } else {
            0.0
        }
    }
}

/// Collects and stores counters describing one run.
#[derive(Debug, serde::Serialize)]
pub struct StatCollector {
    #[serde(skip)]
    pub start_time: Instant,

    // Pagination
    pub pages_walked: AtomicUsize,
    pub pages_pruned: AtomicUsize,
    pub discovery_failures: AtomicUsize,

    // Dispatch
    pub jobs_dispatched: AtomicUsize,

    // Items
    pub items_claimed: AtomicUsize,
    pub items_skipped: AtomicUsize,
    pub items_extracted: AtomicUsize,
    pub extraction_failures: AtomicUsize,
    pub items_delivered: AtomicUsize,
}

impl StatCollector {
    /// Creates a new `StatCollector` with all counters initialized to zero.
    pub(crate) fn new() -> Self {
        StatCollector {
            start_time: Instant::now(),
            pages_walked: AtomicUsize::new(0),
            pages_pruned: AtomicUsize::new(0),
            discovery_failures: AtomicUsize::new(0),
            jobs_dispatched: AtomicUsize::new(0),
            items_claimed: AtomicUsize::new(0),
            items_skipped: AtomicUsize::new(0),
            items_extracted: AtomicUsize::new(0),
            extraction_failures: AtomicUsize::new(0),
            items_delivered: AtomicUsize::new(0),
        }
    }

    /// Creates a snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_walked: self.pages_walked.load(Ordering::SeqCst),
            pages_pruned: self.pages_pruned.load(Ordering::SeqCst),
            discovery_failures: self.discovery_failures.load(Ordering::SeqCst),
            jobs_dispatched: self.jobs_dispatched.load(Ordering::SeqCst),
            items_claimed: self.items_claimed.load(Ordering::SeqCst),
            items_skipped: self.items_skipped.load(Ordering::SeqCst),
            items_extracted: self.items_extracted.load(Ordering::SeqCst),
            extraction_failures: self.extraction_failures.load(Ordering::SeqCst),
            items_delivered: self.items_delivered.load(Ordering::SeqCst),
            elapsed_duration: self.start_time.elapsed(),
        }
    }

    pub(crate) fn increment_pages_walked(&self) {
        self.pages_walked.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_pages_pruned(&self) {
        self.pages_pruned.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_discovery_failures(&self) {
        self.discovery_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_jobs_dispatched(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_claimed(&self) {
        self.items_claimed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_skipped(&self) {
        self.items_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_extracted(&self) {
        self.items_extracted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_extraction_failures(&self) {
        self.extraction_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_items_delivered(&self) {
        self.items_delivered.fetch_add(1, Ordering::SeqCst);
    }

    /// Converts the counters into a JSON string.
    pub fn to_json_string(&self) -> Result<String, PagewalkError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Converts the counters into a pretty-printed JSON string.
    pub fn to_json_string_pretty(&self) -> Result<String, PagewalkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Exports the current counters to a Markdown formatted string.
    pub fn to_markdown_string(&self) -> String {
        let snapshot = self.snapshot();

        format!(
            r#"# Run Statistics Report

- **Duration**: {}
- **Average Speed**: {:.2} pages/s, {:.2} items/s

## Pages
| Metric             | Count |
|--------------------|-------|
| Walked             | {}     |
| Pruned             | {}     |
| Discovery failures | {}     |

## Items
| Metric              | Count |
|---------------------|-------|
| Jobs dispatched     | {}     |
| Claimed             | {}     |
| Skipped (duplicate) | {}     |
| Extracted           | {}     |
| Failed              | {}     |
| Delivered           | {}     |
"#,
            snapshot.formatted_duration(),
            snapshot.pages_per_second(),
            snapshot.items_per_second(),
            snapshot.pages_walked,
            snapshot.pages_pruned,
            snapshot.discovery_failures,
            snapshot.jobs_dispatched,
            snapshot.items_claimed,
            snapshot.items_skipped,
            snapshot.items_extracted,
            snapshot.extraction_failures,
            snapshot.items_delivered,
        )
    }
}

impl Default for StatCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StatCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();

        writeln!(f, "\nRun Statistics")?;
        writeln!(f, "--------------")?;
        writeln!(f, "  duration : {}", snapshot.formatted_duration())?;
        writeln!(
            f,
            "  speed    : pages/s: {:.2}, items/s: {:.2}",
            snapshot.pages_per_second(),
            snapshot.items_per_second()
        )?;
        writeln!(
            f,
            "  pages    : walked: {}, pruned: {}, failed: {}",
            snapshot.pages_walked, snapshot.pages_pruned, snapshot.discovery_failures
        )?;
        writeln!(
            f,
            "  items    : jobs: {}, claimed: {}, skipped: {}, extracted: {}, failed: {}, delivered: {}\n",
            snapshot.jobs_dispatched,
            snapshot.items_claimed,
            snapshot.items_skipped,
            snapshot.items_extracted,
            snapshot.extraction_failures,
            snapshot.items_delivered
        )
    }
}
