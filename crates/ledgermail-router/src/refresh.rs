//! Periodic rule refresh

use crate::RuleRegistry;
use ledgermail_domain::RuleSource;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Refresh settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Time between refreshes (milliseconds)
    /// Default: 600000 (10 minutes)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

fn default_refresh_interval_ms() -> u64 {
    600_000
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl RefreshConfig {
    /// Refresh interval as a Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.refresh_interval_ms == 0 {
            return Err("refresh_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// What one refresh did to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The whole list was replaced
    Replaced {
        /// Rules now active
        count: usize,
    },
    /// The source returned no enabled rule; the previous list was kept
    KeptEmpty,
    /// The fetch failed; the previous list was kept
    KeptOnError(String),
}

/// Keeps a [`RuleRegistry`] in step with a [`RuleSource`]
pub struct RuleRefresher<S: RuleSource> {
    source: S,
    registry: Arc<RuleRegistry>,
    interval: Duration,
}

impl<S: RuleSource> RuleRefresher<S> {
    /// Create a refresher
    pub fn new(source: S, registry: Arc<RuleRegistry>, config: &RefreshConfig) -> Self {
        Self {
            source,
            registry,
            interval: config.refresh_interval(),
        }
    }

    /// Registry being refreshed
    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    /// Fetch once and swap the registry if the result is usable.
    ///
    /// Never fails: errors and empty results leave the registry untouched.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        match self.source.fetch_rules().await {
            Ok(rules) if rules.iter().any(|rule| rule.enabled) => {
                let count = rules.len();
                self.registry.replace(rules);
                info!("Routing rules refreshed: {} active", count);
                RefreshOutcome::Replaced { count }
            }
            Ok(_) => {
                warn!(
                    "Rule source returned no enabled rules, keeping {} current rules",
                    self.registry.len()
                );
                RefreshOutcome::KeptEmpty
            }
            Err(e) => {
                warn!(
                    "Rule refresh failed, keeping {} current rules: {}",
                    self.registry.len(),
                    e
                );
                RefreshOutcome::KeptOnError(e.to_string())
            }
        }
    }

    /// Refresh now and then on every interval, forever
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Refresh now and then on every interval until `shutdown` completes
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        self.refresh_once().await;
        self.periodic_until(shutdown).await
    }

    /// Refresh on every interval, starting one interval from now, until
    /// `shutdown` completes
    pub async fn periodic_until<F: Future<Output = ()>>(&self, shutdown: F) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
                _ = &mut shutdown => {
                    info!("Rule refresher stopped");
                    break;
                }
            }
        }
    }
}

impl<S: RuleSource + 'static> RuleRefresher<S> {
    /// Run [`run`](Self::run) on a background task
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run only the periodic refreshes on a background task, for callers that
    /// already awaited the startup refresh
    pub fn spawn_periodic(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.periodic_until(std::future::pending::<()>()).await
        })
    }
}
