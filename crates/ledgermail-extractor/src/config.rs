//! Configuration for the Extractor

use ledgermail_domain::FieldNames;
use ledgermail_gatekeeper::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for extraction and its retry budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Oracle calls allowed per prompt when the oracle signals a rate limit,
    /// counting the first call
    #[serde(default = "default_max_transport_attempts")]
    pub max_transport_attempts: u32,

    /// Base of the exponential backoff (seconds); attempt `n` waits `2^n * base`
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Output token cap per call; the oracle client's default applies when unset
    #[serde(default)]
    pub max_output_tokens: Option<u32>,

    /// Required bill-number length
    #[serde(default = "default_required_digits")]
    pub required_digits: usize,

    /// JSON keys the prompt asks the oracle to use
    #[serde(default)]
    pub fields: FieldNames,
}

fn default_max_transport_attempts() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    10
}

fn default_required_digits() -> usize {
    8
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_transport_attempts: default_max_transport_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            max_output_tokens: None,
            required_digits: default_required_digits(),
            fields: FieldNames::default(),
        }
    }
}

impl ExtractorConfig {
    /// Lenient preset: more rate-limit attempts with a longer base delay
    pub fn lenient() -> Self {
        Self {
            max_transport_attempts: 5,
            backoff_base_secs: 15,
            ..Self::default()
        }
    }

    /// Backoff base as a Duration
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    /// Validator settings matching the configured field names
    pub fn validation(&self) -> ValidationConfig {
        ValidationConfig {
            required_digits: self.required_digits,
            ..ValidationConfig::from_field_names(&self.fields)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_transport_attempts == 0 {
            return Err("max_transport_attempts must be greater than 0".to_string());
        }
        if self.required_digits == 0 {
            return Err("required_digits must be greater than 0".to_string());
        }
        if self.fields.line_items.is_empty() || self.fields.bill_number.is_empty() {
            return Err("line_items and bill_number field names must not be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
