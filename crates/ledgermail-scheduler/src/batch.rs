//! Bounded-concurrency batch processing

use crate::{BatchCounters, SchedulerConfig};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Whether a per-item result counts as a success
pub trait BatchOutcome {
    /// True when the item succeeded
    fn is_success(&self) -> bool;
}

impl<T, E> BatchOutcome for Result<T, E> {
    fn is_success(&self) -> bool {
        self.is_ok()
    }
}

/// Terminal state of one scheduled item
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<R> {
    /// The item's future completed
    Finished(R),
    /// The item's future panicked; the message is kept
    Panicked(String),
}

impl<R: BatchOutcome> TaskOutcome<R> {
    /// True when the item finished with a successful result
    pub fn is_success(&self) -> bool {
        match self {
            TaskOutcome::Finished(result) => result.is_success(),
            TaskOutcome::Panicked(_) => false,
        }
    }
}

impl<R> TaskOutcome<R> {
    /// The finished result, if the item did not panic
    pub fn finished(self) -> Option<R> {
        match self {
            TaskOutcome::Finished(result) => Some(result),
            TaskOutcome::Panicked(_) => None,
        }
    }
}

/// Runs items in consecutive groups of bounded size.
///
/// All items of a group run concurrently; the next group starts only after
/// every item of the current one reached a terminal state. A fixed pause
/// separates groups. Failures and panics are isolated to their item.
///
/// # Examples
///
/// ```
/// use ledgermail_scheduler::{BatchScheduler, SchedulerConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = SchedulerConfig { inter_group_delay_ms: 0, ..Default::default() };
/// let scheduler = BatchScheduler::new(config);
///
/// let outcomes = scheduler
///     .run(vec![1, 2, 3, 4], |n| async move {
///         if n % 2 == 0 { Ok(n) } else { Err("odd") }
///     })
///     .await;
///
/// assert_eq!(outcomes.len(), 4);
/// assert_eq!(scheduler.counters().snapshot().succeeded, 2);
/// # }
/// ```
#[derive(Debug)]
pub struct BatchScheduler {
    group_size: usize,
    inter_group_delay: Duration,
    counters: Arc<BatchCounters>,
}

impl BatchScheduler {
    /// Create a scheduler with fresh counters
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_counters(config, Arc::new(BatchCounters::new()))
    }

    /// Create a scheduler that records into existing counters
    pub fn with_counters(config: SchedulerConfig, counters: Arc<BatchCounters>) -> Self {
        Self {
            group_size: config.group_size.max(1),
            inter_group_delay: config.inter_group_delay(),
            counters,
        }
    }

    /// Shared counters
    pub fn counters(&self) -> &Arc<BatchCounters> {
        &self.counters
    }

    /// Process every item exactly once and return the outcomes in input order
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, process: F) -> Vec<TaskOutcome<R>>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
        R: BatchOutcome,
    {
        let total = items.len();
        let groups = total.div_ceil(self.group_size);
        let mut outcomes = Vec::with_capacity(total);
        let mut remaining = items.into_iter();
        let process = &process;

        info!(
            "Processing {} items in {} groups of up to {}",
            total, groups, self.group_size
        );

        for group in 0..groups {
            let batch: Vec<T> = remaining.by_ref().take(self.group_size).collect();
            debug!("Starting group {}/{} ({} items)", group + 1, groups, batch.len());

            let tasks = batch.into_iter().map(|item| {
                let counters = &self.counters;
                async move {
                    let outcome = match AssertUnwindSafe(async move { process(item).await })
                        .catch_unwind()
                        .await
                    {
                        Ok(result) => TaskOutcome::Finished(result),
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            error!("Item panicked: {}", message);
                            TaskOutcome::Panicked(message)
                        }
                    };

                    let snapshot = counters.record(outcome.is_success());
                    info!(
                        processed = snapshot.processed,
                        succeeded = snapshot.succeeded,
                        failed = snapshot.failed,
                        "Item finished"
                    );
                    outcome
                }
            });

            outcomes.extend(join_all(tasks).await);

            if group + 1 < groups && !self.inter_group_delay.is_zero() {
                debug!("Pausing {:?} before next group", self.inter_group_delay);
                tokio::time::sleep(self.inter_group_delay).await;
            }
        }

        outcomes
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
