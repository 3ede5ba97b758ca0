//! Poll command implementation.

use crate::app;
use crate::config::{AppConfig, Env};
use crate::error::Result;
use ledgermail_scheduler::PollWorker;

/// Execute the poll command: one refresh (if a source is configured), one cycle.
pub async fn execute_poll(config: &AppConfig, env: &Env) -> Result<()> {
    let registry = app::registry();
    if let Some(refresher) = app::refresher(config, env, registry.clone())? {
        refresher.refresh_once().await;
    }

    let mut cycle = app::ingest_cycle(config, env, registry).await?;
    let mut worker = PollWorker::new(&config.scheduler);
    worker.run_cycles(&mut cycle, 1).await;

    println!("{}", worker.metrics().summary());
    Ok(())
}
