//! Per-item pipeline: extract, validate, persist
//!
//! Every error is caught here and turned into an [`ItemOutcome`]; nothing
//! propagates to the batch scheduler.

use crate::extractor::{Extraction, Extractor};
use crate::prompt::{render_instructions, DEFAULT_EXTRACTION_PROMPT};
use chrono::{SecondsFormat, Utc};
use ledgermail_domain::{
    DocumentSink, DocumentUpload, ExtractionOracle, RawDocument, RoutingRule, SinkReceipt,
};
use ledgermail_scheduler::BatchOutcome;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Key of the bookkeeping block added to persisted JSON
pub const META_KEY: &str = "_meta";

/// Step at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Oracle call or response parsing
    Extraction,
    /// Upload to the document store
    Sink,
}

/// Terminal state of one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    /// Document and JSON were persisted
    Stored {
        /// Identifiers assigned by the store
        receipt: SinkReceipt,
        /// Whether the oracle classified the document as the accepted type
        accepted_type: bool,
        /// Uncorrected validation problem, if any
        concern: Option<String>,
    },
    /// The item could not be completed
    Failed {
        /// Where it failed
        stage: FailureStage,
        /// Error text
        error: String,
    },
}

/// Structured result of processing one document
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// Original filename of the document
    pub filename: String,
    /// Identifier of the message that carried it
    pub message_id: String,
    /// What happened
    pub status: ItemStatus,
}

impl ItemOutcome {
    /// Uncorrected validation concern of a stored item
    pub fn concern(&self) -> Option<&str> {
        match &self.status {
            ItemStatus::Stored { concern, .. } => concern.as_deref(),
            ItemStatus::Failed { .. } => None,
        }
    }
}

impl BatchOutcome for ItemOutcome {
    fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Stored { .. })
    }
}

/// Runs one document through the extractor and into the sink
pub struct DocumentPipeline<O, S>
where
    O: ExtractionOracle,
    S: DocumentSink,
{
    extractor: Extractor<O>,
    sink: Arc<S>,
}

impl<O, S> DocumentPipeline<O, S>
where
    O: ExtractionOracle,
    S: DocumentSink,
{
    /// Create a new pipeline
    pub fn new(extractor: Extractor<O>, sink: Arc<S>) -> Self {
        Self { extractor, sink }
    }

    /// Process one document routed by `rule`.
    ///
    /// The document is consumed and dropped when this returns.
    pub async fn process(&self, document: RawDocument, rule: &RoutingRule) -> ItemOutcome {
        let filename = document.original_filename().to_string();
        let message_id = document.metadata().message_id.clone();

        let template = if rule.prompt_template.trim().is_empty() {
            DEFAULT_EXTRACTION_PROMPT
        } else {
            rule.prompt_template.as_str()
        };
        let instructions = render_instructions(template, &document);

        let extraction = match self.extractor.extract(&document, &instructions).await {
            Ok(extraction) => extraction,
            Err(e) => {
                error!("{}: extraction failed: {}", filename, e);
                return ItemOutcome {
                    filename,
                    message_id,
                    status: ItemStatus::Failed {
                        stage: FailureStage::Extraction,
                        error: e.to_string(),
                    },
                };
            }
        };

        let json = self.document_json(&document, rule, &extraction);
        let upload = DocumentUpload {
            bytes: document.bytes(),
            original_filename: &filename,
            derived_json: Some(&json),
            destination: &rule.destination,
        };

        let status = match self.sink.persist(&upload).await {
            Ok(receipt) => {
                if let Some(concern) = &extraction.concern {
                    warn!("{}: stored with validation concern: {}", filename, concern);
                } else {
                    info!("{}: stored as {}", filename, receipt.primary_file_id);
                }
                ItemStatus::Stored {
                    receipt,
                    accepted_type: extraction.result.is_accepted_document_type,
                    concern: extraction.concern,
                }
            }
            Err(e) => {
                error!("{}: upload failed: {}", filename, e);
                ItemStatus::Failed {
                    stage: FailureStage::Sink,
                    error: e.to_string(),
                }
            }
        };

        ItemOutcome {
            filename,
            message_id,
            status,
        }
    }

    /// Normalised JSON for persistence, with a bookkeeping block
    fn document_json(
        &self,
        document: &RawDocument,
        rule: &RoutingRule,
        extraction: &Extraction,
    ) -> Value {
        let fields = self.extractor.fields();
        let mut json = extraction.result.to_json(fields);
        let metadata = document.metadata();

        if let Value::Object(map) = &mut json {
            if let Some(concern) = &extraction.concern {
                map.entry(fields.validation_error.clone())
                    .or_insert_with(|| Value::String(concern.clone()));
            }
            map.insert(
                META_KEY.to_string(),
                json!({
                    "sourceMessageId": metadata.message_id,
                    "sender": metadata.sender,
                    "subject": metadata.subject,
                    "date": metadata.date,
                    "originalFilename": document.original_filename(),
                    "rule": rule.name,
                    "validationAttempts": extraction.validation_attempts,
                    "transportRetries": extraction.transport_retries,
                    "validationConcern": extraction.concern,
                    "processedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                }),
            );
        }
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractorConfig;
    use async_trait::async_trait;
    use ledgermail_domain::{Destination, SourceMetadata};
    use ledgermail_llm::MockOracle;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("store unavailable")]
    struct StoreDown;

    /// Records uploads in memory
    #[derive(Default)]
    struct MemorySink {
        uploads: Mutex<Vec<(String, Option<Value>, Destination)>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentSink for MemorySink {
        type Error = StoreDown;

        async fn persist(&self, upload: &DocumentUpload<'_>) -> Result<SinkReceipt, StoreDown> {
            if self.fail {
                return Err(StoreDown);
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((
                upload.original_filename.to_string(),
                upload.derived_json.cloned(),
                upload.destination.clone(),
            ));
            Ok(SinkReceipt {
                primary_file_id: format!("file-{}", uploads.len()),
                secondary_file_id: Some(format!("json-{}", uploads.len())),
            })
        }
    }

    fn rule(prompt: &str) -> RoutingRule {
        RoutingRule {
            name: "credits".to_string(),
            match_sender: "example.com".to_string(),
            match_subject: "Credits".to_string(),
            enabled: true,
            prompt_template: prompt.to_string(),
            destination: Destination {
                primary_folder_id: "100".to_string(),
                secondary_folder_id: Some("200".to_string()),
            },
        }
    }

    fn document() -> RawDocument {
        RawDocument::new(
            b"%PDF-1.4".to_vec(),
            "CM-1001.pdf",
            SourceMetadata {
                message_id: "<m1@example.com>".to_string(),
                sender: "no-replies@example.com".to_string(),
                subject: "Credits processed by Example for 123".to_string(),
                date: Some("2026-10-01T09:00:00Z".to_string()),
            },
        )
    }

    fn pipeline(oracle: &MockOracle, sink: Arc<MemorySink>) -> DocumentPipeline<MockOracle, MemorySink> {
        let extractor = Extractor::new(Arc::new(oracle.clone()), ExtractorConfig::default());
        DocumentPipeline::new(extractor, sink)
    }

    #[tokio::test]
    async fn test_stores_document_with_meta() {
        let oracle = MockOracle::new(
            r#"{"isCreditMemo": true, "documentNumber": "CM-1001", "lineItems": [{"billNumber": "12345678"}]}"#,
        );
        let sink = Arc::new(MemorySink::default());

        let outcome = pipeline(&oracle, sink.clone()).process(document(), &rule("")).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.filename, "CM-1001.pdf");
        assert_eq!(outcome.message_id, "<m1@example.com>");

        let uploads = sink.uploads.lock().unwrap();
        let (name, json, destination) = &uploads[0];
        let json = json.as_ref().unwrap();
        assert_eq!(name, "CM-1001.pdf");
        assert_eq!(destination.primary_folder_id, "100");
        assert_eq!(json["documentNumber"], "CM-1001");
        assert_eq!(json["_meta"]["rule"], "credits");
        assert_eq!(json["_meta"]["validationAttempts"], 1);
        assert!(json["_meta"]["validationConcern"].is_null());
    }

    #[tokio::test]
    async fn test_rule_prompt_overrides_default() {
        let oracle = MockOracle::new(r#"{"isCreditMemo": false}"#);
        let sink = Arc::new(MemorySink::default());

        pipeline(&oracle, sink)
            .process(document(), &rule("Custom prompt for {filename}"))
            .await;

        assert_eq!(oracle.instructions()[0], "Custom prompt for CM-1001.pdf");
    }

    #[tokio::test]
    async fn test_default_prompt_when_rule_has_none() {
        let oracle = MockOracle::new(r#"{"isCreditMemo": false}"#);
        let sink = Arc::new(MemorySink::default());

        pipeline(&oracle, sink).process(document(), &rule("  ")).await;

        assert!(oracle.instructions()[0].contains("Attachment: CM-1001.pdf"));
    }

    #[tokio::test]
    async fn test_rejected_document_persisted_with_empty_line_items() {
        let oracle = MockOracle::new(r#"{"isCreditMemo": false, "lineItems": null}"#);
        let sink = Arc::new(MemorySink::default());

        let outcome = pipeline(&oracle, sink.clone()).process(document(), &rule("")).await;

        assert!(matches!(
            outcome.status,
            ItemStatus::Stored { accepted_type: false, concern: None, .. }
        ));
        let uploads = sink.uploads.lock().unwrap();
        let json = uploads[0].1.as_ref().unwrap();
        assert_eq!(json["lineItems"], serde_json::json!([]));
        // One call only: no line items means nothing to validate
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concern_recorded_in_json() {
        let oracle = MockOracle::new(r#"{"lineItems": [{"billNumber": "12"}]}"#);
        let sink = Arc::new(MemorySink::default());

        let outcome = pipeline(&oracle, sink.clone()).process(document(), &rule("")).await;

        assert!(outcome.is_success());
        assert!(outcome.concern().unwrap().contains("has 2 digits"));

        let uploads = sink.uploads.lock().unwrap();
        let json = uploads[0].1.as_ref().unwrap();
        assert_eq!(json["_meta"]["validationAttempts"], 2);
        assert!(json["validationError"].as_str().unwrap().contains("has 2 digits"));
    }

    #[tokio::test]
    async fn test_parse_failure_is_failed_item() {
        let oracle = MockOracle::new("no json here");
        let sink = Arc::new(MemorySink::default());

        let outcome = pipeline(&oracle, sink.clone()).process(document(), &rule("")).await;

        assert!(!outcome.is_success());
        assert!(matches!(
            outcome.status,
            ItemStatus::Failed { stage: FailureStage::Extraction, .. }
        ));
        assert!(sink.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_failed_item() {
        let oracle = MockOracle::new(r#"{"isCreditMemo": false}"#);
        let sink = Arc::new(MemorySink {
            fail: true,
            ..Default::default()
        });

        let outcome = pipeline(&oracle, sink).process(document(), &rule("")).await;

        assert_eq!(
            outcome.status,
            ItemStatus::Failed {
                stage: FailureStage::Sink,
                error: "store unavailable".to_string()
            }
        );
    }
}
