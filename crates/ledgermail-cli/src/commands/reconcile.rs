//! Reconcile command implementation.

use crate::app;
use crate::cli::ReconcileArgs;
use crate::config::{AppConfig, Env};
use crate::error::{CliError, Result};
use ledgermail_extractor::{ArchivedDocument, TransactionReconciler, TransportPolicy};
use ledgermail_scheduler::BatchScheduler;
use ledgermail_store::ArchivedPair;
use std::fs;
use std::sync::Arc;
use tracing::info;

/// Execute the reconcile command.
pub async fn execute_reconcile(args: ReconcileArgs, config: &AppConfig, env: &Env) -> Result<()> {
    let archive = app::archive(config, args.dir.as_deref())?;
    let lookup = app::rest_store(config, env)?.ok_or_else(|| {
        CliError::Config("reconciliation needs store.remote for transaction search".to_string())
    })?;
    let oracle = app::oracle(config, env)?;

    let documents: Vec<ArchivedDocument> = archive
        .pairs()
        .await?
        .into_iter()
        .map(archived_document)
        .collect();
    info!(
        "Reconciling {} documents from {}",
        documents.len(),
        archive.root().display()
    );

    let reconciler = TransactionReconciler::new(
        oracle,
        Arc::new(lookup),
        TransportPolicy::from_config(&config.extractor),
        config.reconcile.clone(),
    );
    let scheduler = BatchScheduler::new(config.scheduler.clone());
    let report = reconciler.reconcile_all(documents, &scheduler).await;
    let text = report.render();

    match args.report {
        Some(path) => {
            fs::write(&path, &text)?;
            eprintln!(
                "Report written to {} ({} matched, {} flagged, {} failed)",
                path.display(),
                report.matched(),
                report.flagged(),
                report.failed()
            );
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn archived_document(pair: ArchivedPair) -> ArchivedDocument {
    ArchivedDocument {
        name: pair.name,
        pdf: pair.pdf,
        extracted: pair.json,
    }
}
