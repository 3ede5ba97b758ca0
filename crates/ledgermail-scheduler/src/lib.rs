//! ledgermail Scheduler
//!
//! Bounded-concurrency batch processing and the timer loop that drives poll
//! cycles.
//!
//! # Overview
//!
//! - **BatchScheduler**: splits items into consecutive groups, runs each group
//!   concurrently, waits for every item of a group before pausing and starting
//!   the next one. One failing or panicking item never aborts the batch.
//! - **BatchCounters**: processed/succeeded/failed counters, monotonic for the
//!   life of a run and logged after each item.
//! - **PollWorker**: runs a [`PollCycle`] on an interval. Cycles never
//!   overlap; a cycle that overruns its interval causes the missed ticks to be
//!   skipped.
//!
//! # Ordering
//!
//! Items within a group complete in no defined order. Groups are strictly
//! sequential: group *k+1* never starts before every item of group *k* has
//! finished.
//!
//! # Configuration
//!
//! ```toml
//! [scheduler]
//! group_size = 3
//! inter_group_delay_ms = 5000
//! poll_interval_secs = 60
//! ```

#![warn(missing_docs)]

mod batch;
mod config;
mod error;
mod metrics;
mod worker;

pub use batch::{BatchOutcome, BatchScheduler, TaskOutcome};
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use metrics::{BatchCounters, CounterSnapshot, CycleSummary, WorkerMetrics};
pub use worker::{PollCycle, PollWorker};
