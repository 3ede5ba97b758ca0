//! Configuration management for the CLI.
//!
//! Settings live in a TOML file; secrets only ever come from the environment
//! (optionally seeded from `.env`).

use crate::error::{CliError, Result};
use ledgermail_extractor::{ExtractorConfig, ReconcileConfig};
use ledgermail_llm::AnthropicConfig;
use ledgermail_router::RefreshConfig;
use ledgermail_scheduler::SchedulerConfig;
use ledgermail_store::{OAuthCredentials, RestStoreConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Oracle API key
pub const ENV_ORACLE_KEY: &str = "ANTHROPIC_API_KEY";
/// Store consumer key
pub const ENV_STORE_CONSUMER_KEY: &str = "LEDGERMAIL_STORE_CONSUMER_KEY";
/// Store consumer secret
pub const ENV_STORE_CONSUMER_SECRET: &str = "LEDGERMAIL_STORE_CONSUMER_SECRET";
/// Store token id
pub const ENV_STORE_TOKEN_ID: &str = "LEDGERMAIL_STORE_TOKEN_ID";
/// Store token secret
pub const ENV_STORE_TOKEN_SECRET: &str = "LEDGERMAIL_STORE_TOKEN_SECRET";
/// Optional bearer token for the rule source
pub const ENV_RULES_TOKEN: &str = "LEDGERMAIL_RULES_TOKEN";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Oracle client
    #[serde(default)]
    pub oracle: AnthropicConfig,

    /// Extraction and validation
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Batching and polling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Routing-rule source
    #[serde(default)]
    pub rules: RulesConfig,

    /// Where accepted documents go
    #[serde(default)]
    pub store: StoreConfig,

    /// Inbound mail
    #[serde(default)]
    pub mailbox: MailboxConfig,

    /// Transaction reconciliation
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Routing-rule source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Rule endpoint. Without one the built-in rules are used.
    #[serde(default)]
    pub url: Option<String>,

    /// Refresh timing
    #[serde(flatten)]
    pub refresh: RefreshConfig,
}

/// Storage targets. At least one must be configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Signed REST store
    #[serde(default)]
    pub remote: Option<RestStoreConfig>,

    /// OAuth realm (account id) for the REST store
    #[serde(default)]
    pub realm: Option<String>,

    /// Local archive directory
    #[serde(default = "default_local_dir")]
    pub local_dir: Option<PathBuf>,
}

fn default_local_dir() -> Option<PathBuf> {
    Some(PathBuf::from("archive"))
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            remote: None,
            realm: None,
            local_dir: default_local_dir(),
        }
    }
}

/// Spool mailbox settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Spool root holding `incoming/` and `processed/`
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("spool")
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            spool_dir: default_spool_dir(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    ///
    /// An unreadable or invalid file is an error, never silently replaced by
    /// defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    CliError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.extractor.validate().map_err(CliError::Config)?;
        self.scheduler.validate().map_err(CliError::Config)?;
        self.rules.refresh.validate().map_err(CliError::Config)?;
        if let Some(remote) = &self.store.remote {
            remote.validate().map_err(CliError::Config)?;
        }
        if self.store.remote.is_none() && self.store.local_dir.is_none() {
            return Err(CliError::Config(
                "store needs a remote endpoint or a local_dir".to_string(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of the environment used for secrets.
#[derive(Debug, Clone, Default)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Capture the process environment
    pub fn system() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value of `name`
    pub fn optional(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Non-empty value of `name`, or `MissingEnv`
    pub fn require(&self, name: &str) -> Result<String> {
        self.optional(name)
            .ok_or_else(|| CliError::MissingEnv(name.to_string()))
    }

    /// Oracle API key
    pub fn oracle_key(&self) -> Result<String> {
        self.require(ENV_ORACLE_KEY)
    }

    /// Store credentials; every variable is required
    pub fn store_credentials(&self, realm: Option<String>) -> Result<OAuthCredentials> {
        Ok(OAuthCredentials {
            consumer_key: self.require(ENV_STORE_CONSUMER_KEY)?,
            consumer_secret: self.require(ENV_STORE_CONSUMER_SECRET)?,
            token_id: self.require(ENV_STORE_TOKEN_ID)?,
            token_secret: self.require(ENV_STORE_TOKEN_SECRET)?,
            realm,
        })
    }

    /// Rule source bearer token, if any
    pub fn rules_token(&self) -> Option<String> {
        self.optional(ENV_RULES_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.group_size, 3);
        assert_eq!(config.rules.refresh.refresh_interval(), Duration::from_secs(600));
        assert_eq!(config.store.local_dir, Some(PathBuf::from("archive")));
        assert!(config.rules.url.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [scheduler]
            group_size = 5

            [rules]
            url = "https://config.example.com/rules"
            refresh_interval_ms = 60000

            [store.remote]
            url = "https://store.example.com/restlet.nl?script=1&deploy=1"

            [mailbox]
            spool_dir = "/var/spool/ledgermail"
            "#,
        )
        .unwrap();

        assert_eq!(config.scheduler.group_size, 5);
        assert_eq!(config.scheduler.inter_group_delay_ms, 5000);
        assert_eq!(config.rules.refresh.refresh_interval_ms, 60000);
        assert_eq!(config.store.remote.as_ref().unwrap().timeout_secs, 60);
        assert_eq!(config.mailbox.spool_dir, PathBuf::from("/var/spool/ledgermail"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_section_rejected() {
        let config = AppConfig::from_toml("[scheduler]\ngroup_size = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/ledgermail.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledgermail.toml");
        fs::write(&path, "[extractor]\nmax_transport_attempts = 4\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.extractor.max_transport_attempts, 4);
    }

    #[test]
    fn test_missing_secret_is_named() {
        let env = Env::from_pairs([(ENV_STORE_CONSUMER_KEY, "ck")]);

        match env.store_credentials(None) {
            Err(CliError::MissingEnv(name)) => assert_eq!(name, ENV_STORE_CONSUMER_SECRET),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(env.oracle_key(), Err(CliError::MissingEnv(_))));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let env = Env::from_pairs([(ENV_ORACLE_KEY, "  "), (ENV_RULES_TOKEN, "tok")]);
        assert!(env.oracle_key().is_err());
        assert_eq!(env.rules_token().as_deref(), Some("tok"));
    }
}
