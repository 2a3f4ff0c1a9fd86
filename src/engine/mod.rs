//! # Engine Module
//!
//! Implements the concurrency core that walks paginated listings.
//!
//! ## Overview
//!
//! The engine module provides the `Engine` struct and the tasks it wires
//! together for one run. Pages are walked, their item URLs are batched into
//! jobs, jobs are fanned out into one extraction per unique item, and items are
//! handed one by one to the caller's callback.
//!
//! ## Key Components
//!
//! - **Engine**: owns the strategies and the callback, and runs the shutdown protocol
//! - **Walker**: claims pages, submits jobs and spawns a walk per unclaimed next page
//! - **Job Dispatcher**: claims item URLs and launches throttled extraction tasks
//! - **Result Sink**: the single consumer that invokes the callback
//!
//! ## Architecture
//!
//! Every walk and every extraction is its own tokio task. The walker talks to
//! the dispatcher over the job queue and extractions talk to the sink over the
//! item channel, both `kanal` channels. A `CompletionTracker` counts
//! outstanding walks and extractions; the engine tears the channels down only
//! once it reaches zero or cancellation has unwound the run.

mod core;
mod dispatcher;
mod sink;
mod walker;

pub use self::core::Engine;
pub use self::sink::Callback;
pub(crate) use self::dispatcher::spawn_job_dispatcher;
pub(crate) use self::sink::spawn_result_sink;
pub(crate) use self::walker::Walker;

#[cfg(test)]
pub(crate) mod test_support;
