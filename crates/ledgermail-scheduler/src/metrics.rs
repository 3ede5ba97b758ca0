//! Counters for batch runs and poll cycles

use std::sync::atomic::{AtomicUsize, Ordering};

/// Running item counters shared by every task of a batch.
///
/// Monotonic: values only ever increase and are never reset mid-run.
#[derive(Debug, Default)]
pub struct BatchCounters {
    processed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Point-in-time copy of [`BatchCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Items that reached a terminal state
    pub processed: usize,
    /// Items that succeeded
    pub succeeded: usize,
    /// Items that failed
    pub failed: usize,
}

impl BatchCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one terminal item and return the counters after the update
    pub fn record(&self, success: bool) -> CounterSnapshot {
        if success {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.snapshot()
    }

    /// Current values
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            processed: self.processed.load(Ordering::SeqCst),
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Messages fetched from the source
    pub messages: usize,
    /// Messages that matched no routing rule
    pub unmatched: usize,
    /// Item counters for the cycle
    pub items: CounterSnapshot,
}

/// Cumulative statistics for the poll worker
#[derive(Debug, Clone, Default)]
pub struct WorkerMetrics {
    /// Cycles that completed
    pub cycle_count: usize,

    /// Cycles that returned an error
    pub failed_cycles: usize,

    /// Messages fetched across all cycles
    pub messages: usize,

    /// Items processed across all cycles
    pub items_processed: usize,

    /// Items that succeeded across all cycles
    pub items_succeeded: usize,

    /// Items that failed across all cycles
    pub items_failed: usize,
}

impl WorkerMetrics {
    /// Create empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed cycle
    pub fn record_cycle(&mut self, summary: &CycleSummary) {
        self.cycle_count += 1;
        self.messages += summary.messages;
        self.items_processed += summary.items.processed;
        self.items_succeeded += summary.items.succeeded;
        self.items_failed += summary.items.failed;
    }

    /// Record a cycle that failed before finishing
    pub fn record_failure(&mut self) {
        self.failed_cycles += 1;
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        [
            "Poll Worker Summary".to_string(),
            "===================".to_string(),
            format!("Cycles: {} ({} failed)", self.cycle_count, self.failed_cycles),
            format!("Messages: {}", self.messages),
            format!(
                "Items: {} processed, {} succeeded, {} failed",
                self.items_processed, self.items_succeeded, self.items_failed
            ),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_record() {
        let counters = BatchCounters::new();
        counters.record(true);
        counters.record(false);
        let snapshot = counters.record(true);

        assert_eq!(
            snapshot,
            CounterSnapshot {
                processed: 3,
                succeeded: 2,
                failed: 1
            }
        );
        assert_eq!(counters.snapshot(), snapshot);
    }

    #[test]
    fn test_worker_metrics() {
        let mut metrics = WorkerMetrics::new();
        metrics.record_cycle(&CycleSummary {
            messages: 2,
            unmatched: 0,
            items: CounterSnapshot {
                processed: 4,
                succeeded: 3,
                failed: 1,
            },
        });
        metrics.record_failure();

        assert_eq!(metrics.cycle_count, 1);
        assert_eq!(metrics.failed_cycles, 1);
        assert_eq!(metrics.items_processed, 4);

        let summary = metrics.summary();
        assert!(summary.contains("Cycles: 1 (1 failed)"));
        assert!(summary.contains("4 processed, 3 succeeded, 1 failed"));

        metrics.reset();
        assert_eq!(metrics.cycle_count, 0);
    }
}
