//! One poll cycle: mailbox to store.

use crate::error::CliError;
use async_trait::async_trait;
use ledgermail_domain::{
    match_rule, DocumentSink, ExtractionOracle, MessageSource, RawDocument, RoutingRule,
};
use ledgermail_extractor::DocumentPipeline;
use ledgermail_mail::parse_message;
use ledgermail_router::RuleRegistry;
use ledgermail_scheduler::{BatchScheduler, CounterSnapshot, CycleSummary, PollCycle};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fetches new messages, routes them, and runs their PDF attachments through
/// the pipeline under the batch scheduler.
pub struct IngestCycle<M, O, S>
where
    M: MessageSource,
    O: ExtractionOracle,
    S: DocumentSink,
{
    mailbox: M,
    registry: Arc<RuleRegistry>,
    pipeline: DocumentPipeline<O, S>,
    scheduler: BatchScheduler,
}

impl<M, O, S> IngestCycle<M, O, S>
where
    M: MessageSource,
    O: ExtractionOracle,
    S: DocumentSink,
{
    /// Create a cycle
    pub fn new(
        mailbox: M,
        registry: Arc<RuleRegistry>,
        pipeline: DocumentPipeline<O, S>,
        scheduler: BatchScheduler,
    ) -> Self {
        Self {
            mailbox,
            registry,
            pipeline,
            scheduler,
        }
    }

    /// Mailbox, for inspection
    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }
}

#[async_trait]
impl<M, O, S> PollCycle for IngestCycle<M, O, S>
where
    M: MessageSource,
    O: ExtractionOracle,
    S: DocumentSink,
{
    type Error = CliError;

    async fn run_cycle(&mut self) -> Result<CycleSummary, CliError> {
        let messages = self
            .mailbox
            .fetch_new()
            .await
            .map_err(|e| CliError::Ingest(e.to_string()))?;
        if messages.is_empty() {
            debug!("No new messages");
            return Ok(CycleSummary::default());
        }

        // One snapshot per cycle; a concurrent refresh applies from the next cycle
        let rules = self.registry.snapshot();
        let mut unmatched = 0;
        let mut items: Vec<(RawDocument, RoutingRule)> = Vec::new();

        for message in &messages {
            let parsed = match parse_message(&message.raw, &message.id) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping {}: {}", message.id, e);
                    unmatched += 1;
                    continue;
                }
            };

            let Some(rule) = match_rule(&rules, parsed.sender(), parsed.subject()) else {
                debug!(
                    "No rule for {} (from {}, subject {:?})",
                    message.id,
                    parsed.sender(),
                    parsed.subject()
                );
                unmatched += 1;
                continue;
            };

            let documents = parsed.pdf_attachments();
            info!(
                "{}: rule '{}' matched, {} PDF attachments",
                message.id,
                rule.name,
                documents.len()
            );
            items.extend(documents.into_iter().map(|doc| (doc, rule.clone())));
        }

        let pipeline = &self.pipeline;
        let outcomes = self
            .scheduler
            .run(items, |(document, rule)| async move {
                pipeline.process(document, &rule).await
            })
            .await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let counters = CounterSnapshot {
            processed: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        };

        // Every item has reached a terminal state, so each message can be
        // checkpointed, matched or not
        for message in &messages {
            if let Err(e) = self.mailbox.mark_processed(&message.id).await {
                error!("Failed to checkpoint {}: {}", message.id, e);
            }
        }

        let summary = CycleSummary {
            messages: messages.len(),
            unmatched,
            items: counters,
        };
        info!(
            "Cycle done: {} messages ({} unmatched), {} items ({} succeeded, {} failed)",
            summary.messages,
            summary.unmatched,
            counters.processed,
            counters.succeeded,
            counters.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use ledgermail_domain::Destination;
    use ledgermail_extractor::{Extractor, ExtractorConfig};
    use ledgermail_llm::MockOracle;
    use ledgermail_mail::SpoolMailbox;
    use ledgermail_scheduler::SchedulerConfig;
    use ledgermail_store::LocalArchive;
    use tempfile::TempDir;

    const GOOD: &str = r#"{"isCreditMemo": true, "lineItems": [{"billNumber": "12345678"}]}"#;

    fn eml(from: &str, subject: &str, pdfs: &[&str]) -> Vec<u8> {
        let mut out = format!(
            "From: {}\r\nSubject: {}\r\nMessage-ID: <{}@example.com>\r\n\
             MIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=\"B\"\r\n\r\n\
             --B\r\nContent-Type: text/plain\r\n\r\nhello\r\n",
            from,
            subject,
            subject.len()
        );
        for name in pdfs {
            out.push_str(&format!(
                "--B\r\nContent-Type: application/pdf; name=\"{0}\"\r\n\
                 Content-Disposition: attachment; filename=\"{0}\"\r\n\
                 Content-Transfer-Encoding: base64\r\n\r\n{1}\r\n",
                name,
                base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4 test")
            ));
        }
        out.push_str("--B--\r\n");
        out.into_bytes()
    }

    fn rule() -> RoutingRule {
        RoutingRule {
            name: "credits".to_string(),
            match_sender: "example.com".to_string(),
            match_subject: "Credits processed by Example".to_string(),
            enabled: true,
            prompt_template: String::new(),
            destination: Destination {
                primary_folder_id: "1001".to_string(),
                secondary_folder_id: None,
            },
        }
    }

    async fn cycle(
        spool: &TempDir,
        archive: &TempDir,
        oracle: MockOracle,
    ) -> IngestCycle<SpoolMailbox, MockOracle, LocalArchive> {
        let mailbox = SpoolMailbox::open(spool.path()).await.unwrap();
        let extractor = Extractor::new(Arc::new(oracle), ExtractorConfig::default());
        let pipeline = DocumentPipeline::new(extractor, Arc::new(LocalArchive::new(archive.path())));
        IngestCycle::new(
            mailbox,
            Arc::new(RuleRegistry::new(vec![rule()])),
            pipeline,
            BatchScheduler::new(SchedulerConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_cycle_routes_processes_and_checkpoints() {
        let spool = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let mut cycle = cycle(&spool, &archive, MockOracle::new(GOOD)).await;

        let incoming = cycle.mailbox().incoming_dir().to_path_buf();
        std::fs::write(
            incoming.join("001.eml"),
            eml(
                "no-replies@example.com",
                "Credits processed by Example for 123",
                &["a.pdf", "b.pdf"],
            ),
        )
        .unwrap();
        std::fs::write(
            incoming.join("002.eml"),
            eml("someone@other.org", "Lunch", &["menu.pdf"]),
        )
        .unwrap();

        let summary = cycle.run_cycle().await.unwrap();

        assert_eq!(summary.messages, 2);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(
            summary.items,
            CounterSnapshot {
                processed: 2,
                succeeded: 2,
                failed: 0
            }
        );

        // Both messages checkpointed, including the unmatched one
        assert_eq!(std::fs::read_dir(&incoming).unwrap().count(), 0);
        let pairs = LocalArchive::new(archive.path()).pairs().await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].json["_meta"]["rule"], "credits");

        // Nothing new on the next cycle
        let again = cycle.run_cycle().await.unwrap();
        assert_eq!(again, CycleSummary::default());
    }

    #[tokio::test]
    async fn test_failed_item_still_checkpoints_message() {
        let spool = TempDir::new().unwrap();
        let archive = TempDir::new().unwrap();
        let mut cycle = cycle(&spool, &archive, MockOracle::new("no json here")).await;

        let incoming = cycle.mailbox().incoming_dir().to_path_buf();
        std::fs::write(
            incoming.join("001.eml"),
            eml("no-replies@example.com", "Credits processed by Example", &["a.pdf"]),
        )
        .unwrap();

        let summary = cycle.run_cycle().await.unwrap();

        assert_eq!(summary.items.failed, 1);
        assert_eq!(std::fs::read_dir(&incoming).unwrap().count(), 0);
        assert!(LocalArchive::new(archive.path()).pairs().await.unwrap().is_empty());
    }
}
