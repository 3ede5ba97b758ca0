//! Configuration for batch scheduling and polling

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the batch scheduler and the poll worker
///
/// # Examples
///
/// ```
/// use ledgermail_scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::default();
/// assert_eq!(config.group_size, 3);
/// assert_eq!(config.inter_group_delay_ms, 5000);
///
/// // One item at a time, for tight oracle rate limits
/// let config = SchedulerConfig::sequential();
/// assert_eq!(config.group_size, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Items processed concurrently in one group
    /// Default: 3
    #[serde(default = "default_group_size")]
    pub group_size: usize,

    /// Pause between consecutive groups (milliseconds). Not applied after the last group.
    /// Default: 5000
    #[serde(default = "default_inter_group_delay_ms")]
    pub inter_group_delay_ms: u64,

    /// How often the poll worker checks the mailbox (seconds)
    /// Default: 60
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_group_size() -> usize {
    3
}

fn default_inter_group_delay_ms() -> u64 {
    5000
}

fn default_poll_interval_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            inter_group_delay_ms: default_inter_group_delay_ms(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl SchedulerConfig {
    /// One item per group with a longer pause
    pub fn sequential() -> Self {
        Self {
            group_size: 1,
            inter_group_delay_ms: 10_000,
            poll_interval_secs: default_poll_interval_secs(),
        }
    }

    /// Pause between groups as a Duration
    pub fn inter_group_delay(&self) -> Duration {
        Duration::from_millis(self.inter_group_delay_ms)
    }

    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.group_size == 0 {
            return Err("group_size must be greater than 0".to_string());
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}
