//! Run command implementation.

use crate::app;
use crate::config::{AppConfig, Env};
use crate::error::Result;
use ledgermail_scheduler::PollWorker;

/// Execute the run command.
///
/// Rules are refreshed once before the first poll, then on the configured
/// interval in the background. Returns after Ctrl+C, once the in-flight cycle
/// has finished.
pub async fn execute_run(config: &AppConfig, env: &Env) -> Result<()> {
    let registry = app::registry();

    let refresh_task = match app::refresher(config, env, registry.clone())? {
        Some(refresher) => {
            refresher.refresh_once().await;
            Some(refresher.spawn_periodic())
        }
        None => None,
    };

    let mut cycle = app::ingest_cycle(config, env, registry).await?;
    let mut worker = PollWorker::new(&config.scheduler);
    let result = worker.run(&mut cycle).await;

    if let Some(task) = refresh_task {
        task.abort();
    }

    println!("{}", worker.metrics().summary());
    Ok(result?)
}
