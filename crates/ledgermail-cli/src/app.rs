//! Wiring from configuration to live components.

use crate::config::{AppConfig, Env};
use crate::error::{CliError, Result};
use crate::ingest::IngestCycle;
use ledgermail_extractor::{DocumentPipeline, Extractor};
use ledgermail_llm::AnthropicOracle;
use ledgermail_mail::SpoolMailbox;
use ledgermail_router::{HttpRuleSource, RuleRefresher, RuleRegistry};
use ledgermail_scheduler::BatchScheduler;
use ledgermail_store::{ArchiveSink, LocalArchive, RestDocumentStore};
use std::sync::Arc;
use tracing::info;

/// Production ingest cycle
pub type LiveIngestCycle = IngestCycle<SpoolMailbox, AnthropicOracle, ArchiveSink>;

/// Oracle client; needs `ANTHROPIC_API_KEY`
pub fn oracle(config: &AppConfig, env: &Env) -> Result<Arc<AnthropicOracle>> {
    let oracle = AnthropicOracle::new(config.oracle.clone(), env.oracle_key()?)?;
    info!("Oracle model: {}", oracle.model());
    Ok(Arc::new(oracle))
}

/// Signed REST store; needs the store credentials
pub fn rest_store(config: &AppConfig, env: &Env) -> Result<Option<RestDocumentStore>> {
    let Some(remote) = &config.store.remote else {
        return Ok(None);
    };
    let credentials = env.store_credentials(config.store.realm.clone())?;
    Ok(Some(RestDocumentStore::new(remote.clone(), credentials)?))
}

/// Remote store, local archive, or both
pub fn sink(config: &AppConfig, env: &Env) -> Result<ArchiveSink> {
    let remote = rest_store(config, env)?;
    let local = config.store.local_dir.as_ref().map(LocalArchive::new);
    Ok(ArchiveSink::new(remote, local)?)
}

/// Registry seeded with the built-in rules
pub fn registry() -> Arc<RuleRegistry> {
    Arc::new(RuleRegistry::default())
}

/// Refresher for `registry`, if a rule source is configured
pub fn refresher(
    config: &AppConfig,
    env: &Env,
    registry: Arc<RuleRegistry>,
) -> Result<Option<RuleRefresher<HttpRuleSource>>> {
    let Some(url) = &config.rules.url else {
        info!("No rule source configured, using built-in rules");
        return Ok(None);
    };
    let source = HttpRuleSource::new(url.clone(), env.rules_token())?;
    Ok(Some(RuleRefresher::new(
        source,
        registry,
        &config.rules.refresh,
    )))
}

/// Ingest cycle over the configured spool, oracle and sink
pub async fn ingest_cycle(
    config: &AppConfig,
    env: &Env,
    registry: Arc<RuleRegistry>,
) -> Result<LiveIngestCycle> {
    let oracle = oracle(config, env)?;
    let sink = Arc::new(sink(config, env)?);
    let mailbox = SpoolMailbox::open(&config.mailbox.spool_dir).await?;

    let extractor = Extractor::new(oracle, config.extractor.clone());
    Ok(IngestCycle::new(
        mailbox,
        registry,
        DocumentPipeline::new(extractor, sink),
        BatchScheduler::new(config.scheduler.clone()),
    ))
}

/// Local archive used by reconciliation
pub fn archive(config: &AppConfig, dir: Option<&std::path::Path>) -> Result<LocalArchive> {
    match dir.or(config.store.local_dir.as_deref()) {
        Some(dir) => Ok(LocalArchive::new(dir)),
        None => Err(CliError::Config(
            "no archive directory: pass --dir or set store.local_dir".to_string(),
        )),
    }
}
