//! Background worker driving poll cycles on a timer

use crate::{CycleSummary, SchedulerConfig, SchedulerError, WorkerMetrics};
use async_trait::async_trait;
use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// One unit of periodic work, such as checking a mailbox and processing
/// whatever arrived.
#[async_trait]
pub trait PollCycle: Send {
    /// Error type for a failed cycle
    type Error: std::fmt::Display + Send;

    /// Run one complete cycle
    async fn run_cycle(&mut self) -> Result<CycleSummary, Self::Error>;
}

/// Runs a [`PollCycle`] at a fixed interval.
///
/// Each cycle is awaited to completion before the next tick is considered, so
/// cycles never overlap. Ticks missed while a long cycle was running are
/// skipped rather than replayed. A failed cycle is logged and the worker keeps
/// going.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use ledgermail_scheduler::{CycleSummary, PollCycle, PollWorker, SchedulerConfig};
///
/// struct Noop;
///
/// #[async_trait]
/// impl PollCycle for Noop {
///     type Error = String;
///     async fn run_cycle(&mut self) -> Result<CycleSummary, String> {
///         Ok(CycleSummary::default())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut worker = PollWorker::new(&SchedulerConfig::default());
///     // Run until Ctrl+C
///     worker.run(&mut Noop).await?;
///     Ok(())
/// }
/// ```
pub struct PollWorker {
    interval: Duration,
    metrics: WorkerMetrics,
}

impl PollWorker {
    /// Create a worker using the configured poll interval
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::with_interval(config.poll_interval())
    }

    /// Create a worker with an explicit interval
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            metrics: WorkerMetrics::new(),
        }
    }

    /// Run until Ctrl+C.
    ///
    /// A cycle in flight when the signal arrives is allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns an error only if the signal handler cannot be installed.
    pub async fn run<C: PollCycle>(&mut self, cycle: &mut C) -> Result<(), SchedulerError> {
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| SchedulerError::Worker(format!("Signal handler failed: {}", e)))
        };
        self.run_until(cycle, shutdown).await
    }

    /// Run until `shutdown` completes.
    ///
    /// The shutdown future is only polled between cycles, never while one is
    /// running.
    pub async fn run_until<C, S>(&mut self, cycle: &mut C, shutdown: S) -> Result<(), SchedulerError>
    where
        C: PollCycle,
        S: Future<Output = Result<(), SchedulerError>>,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!("Poll worker started (interval: {:?})", self.interval);

        let result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_one(cycle).await;
                }
                signal = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping poll worker");
                    break signal;
                }
            }
        };

        tracing::info!("Poll worker stopped.\n{}", self.metrics.summary());
        result
    }

    /// Run a fixed number of cycles (useful for testing and one-shot polls)
    pub async fn run_cycles<C: PollCycle>(&mut self, cycle: &mut C, cycles: usize) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        for n in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting poll cycle {}/{}", n + 1, cycles);
            self.run_one(cycle).await;
        }
    }

    async fn run_one<C: PollCycle>(&mut self, cycle: &mut C) {
        match cycle.run_cycle().await {
            Ok(summary) => {
                tracing::info!(
                    "Poll cycle completed: {} messages ({} unmatched), {} items, {} succeeded, {} failed",
                    summary.messages,
                    summary.unmatched,
                    summary.items.processed,
                    summary.items.succeeded,
                    summary.items.failed
                );
                self.metrics.record_cycle(&summary);
            }
            Err(e) => {
                tracing::error!("Poll cycle failed: {}", e);
                self.metrics.record_failure();
            }
        }
    }

    /// Cumulative metrics
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}
