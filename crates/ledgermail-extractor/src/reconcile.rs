//! Transaction reconciliation
//!
//! The later validation stage: for each archived document, find the
//! accounting transaction created from it and ask the oracle whether the two
//! agree. Runs through the batch scheduler like ingestion does.

use crate::error::ExtractorError;
use crate::extractor::oracle_failure;
use crate::parser::extract_json_object;
use crate::prompt::reconcile_prompt;
use crate::retry::TransportPolicy;
use ledgermail_domain::{DocumentPart, ExtractionOracle, OracleRequest, TransactionLookup};
use ledgermail_scheduler::{BatchOutcome, BatchScheduler, TaskOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for the reconciliation stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Transaction field searched for the document key
    #[serde(default = "default_lookup_field")]
    pub lookup_field: String,

    /// JSON pointers into the archived JSON, tried in order, yielding the key
    #[serde(default = "default_key_pointers")]
    pub key_pointers: Vec<String>,

    /// Diagnostic text in reports is cut to this many characters
    #[serde(default = "default_max_report_chars")]
    pub max_report_chars: usize,

    /// Output token cap per oracle call
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_lookup_field() -> String {
    "tranId".to_string()
}

fn default_key_pointers() -> Vec<String> {
    vec![
        "/lineItems/0/billNumber".to_string(),
        "/documentNumber".to_string(),
    ]
}

fn default_max_report_chars() -> usize {
    300
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            lookup_field: default_lookup_field(),
            key_pointers: default_key_pointers(),
            max_report_chars: default_max_report_chars(),
            max_output_tokens: None,
        }
    }
}

/// A document previously written to the archive, with its derived JSON
#[derive(Debug, Clone)]
pub struct ArchivedDocument {
    /// Display name (archive file name)
    pub name: String,
    /// PDF bytes
    pub pdf: Vec<u8>,
    /// JSON written next to the PDF at ingestion
    pub extracted: Value,
}

/// Result of comparing one document with its transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The oracle found no discrepancy
    Matched,
    /// The oracle reported discrepancies
    Flagged(Vec<String>),
    /// The check could not be completed
    Failed(String),
}

/// Reconciliation outcome for one document
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Document name
    pub name: String,
    /// Key used for the transaction lookup, when one was found
    pub key: Option<String>,
    /// Verdict
    pub verdict: Verdict,
}

impl BatchOutcome for ReconcileOutcome {
    fn is_success(&self) -> bool {
        !matches!(self.verdict, Verdict::Failed(_))
    }
}

/// Compares archived documents with booked transactions
pub struct TransactionReconciler<O, L>
where
    O: ExtractionOracle,
    L: TransactionLookup,
{
    oracle: Arc<O>,
    lookup: Arc<L>,
    transport: TransportPolicy,
    config: ReconcileConfig,
}

impl<O, L> TransactionReconciler<O, L>
where
    O: ExtractionOracle,
    L: TransactionLookup,
{
    /// Create a reconciler
    pub fn new(
        oracle: Arc<O>,
        lookup: Arc<L>,
        transport: TransportPolicy,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            oracle,
            lookup,
            transport,
            config,
        }
    }

    /// Check one document
    pub async fn check(&self, document: ArchivedDocument) -> ReconcileOutcome {
        let key = self.document_key(&document.extracted);
        let verdict = match &key {
            None => Verdict::Failed("No lookup key in extracted data".to_string()),
            Some(key) => match self.compare(&document, key).await {
                Ok(verdict) => verdict,
                Err(e) => Verdict::Failed(e.to_string()),
            },
        };

        match &verdict {
            Verdict::Matched => info!("{}: transaction matches", document.name),
            Verdict::Flagged(items) => {
                warn!("{}: {} discrepancies", document.name, items.len())
            }
            Verdict::Failed(e) => warn!("{}: reconciliation failed: {}", document.name, e),
        }

        ReconcileOutcome {
            name: document.name,
            key,
            verdict,
        }
    }

    /// Check every document through the scheduler
    pub async fn reconcile_all(
        &self,
        documents: Vec<ArchivedDocument>,
        scheduler: &BatchScheduler,
    ) -> ReconcileReport {
        let names: Vec<String> = documents.iter().map(|d| d.name.clone()).collect();
        let outcomes = scheduler.run(documents, |doc| self.check(doc)).await;

        let outcomes = names
            .into_iter()
            .zip(outcomes)
            .map(|(name, outcome)| match outcome {
                TaskOutcome::Finished(outcome) => outcome,
                TaskOutcome::Panicked(message) => ReconcileOutcome {
                    name,
                    key: None,
                    verdict: Verdict::Failed(format!("panicked: {}", message)),
                },
            })
            .collect();

        ReconcileReport::new(outcomes, self.config.max_report_chars)
    }

    fn document_key(&self, extracted: &Value) -> Option<String> {
        self.config.key_pointers.iter().find_map(|pointer| {
            match extracted.pointer(pointer)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        })
    }

    async fn compare(
        &self,
        document: &ArchivedDocument,
        key: &str,
    ) -> Result<Verdict, ExtractorError> {
        let transaction = self
            .lookup
            .find_transaction(&self.config.lookup_field, key)
            .await
            .map_err(|e| ExtractorError::Lookup(e.to_string()))?
            .ok_or_else(|| {
                ExtractorError::Lookup(format!(
                    "No transaction with {} = {}",
                    self.config.lookup_field, key
                ))
            })?;

        let instructions = reconcile_prompt(&transaction, &document.extracted);
        let request = OracleRequest {
            document: Some(DocumentPart::pdf(&document.pdf)),
            instructions: &instructions,
            max_output_tokens: self.config.max_output_tokens,
        };

        let response = self
            .transport
            .run(|_| self.oracle.complete(&request))
            .await
            .map_err(oracle_failure)?;

        parse_verdict(&extract_json_object(&response.value.text)?)
    }
}

/// Read `{"matches": bool, "discrepancies": [..]}`
fn parse_verdict(value: &Value) -> Result<Verdict, ExtractorError> {
    let matches = value
        .get("matches")
        .and_then(Value::as_bool)
        .ok_or_else(|| ExtractorError::Parse("Response has no boolean \"matches\"".to_string()))?;

    let discrepancies: Vec<String> = value
        .get("discrepancies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(match (matches, discrepancies.is_empty()) {
        (true, true) => Verdict::Matched,
        (false, true) => Verdict::Flagged(vec!["Mismatch reported without details".to_string()]),
        (_, false) => Verdict::Flagged(discrepancies),
    })
}

/// Summary of a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// Outcomes in input order
    pub outcomes: Vec<ReconcileOutcome>,
    max_chars: usize,
}

impl ReconcileReport {
    /// Build a report, truncating diagnostics to `max_chars` when rendered
    pub fn new(outcomes: Vec<ReconcileOutcome>, max_chars: usize) -> Self {
        Self { outcomes, max_chars }
    }

    /// Documents that matched
    pub fn matched(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Matched))
    }

    /// Documents with discrepancies
    pub fn flagged(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Flagged(_)))
    }

    /// Documents that could not be checked
    pub fn failed(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.verdict)).count()
    }

    /// Plain-text report listing flagged and failed documents
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Transaction Reconciliation Report");
        let _ = writeln!(out, "=================================");
        let _ = writeln!(
            out,
            "Checked: {}  Matched: {}  Flagged: {}  Failed: {}",
            self.outcomes.len(),
            self.matched(),
            self.flagged(),
            self.failed()
        );

        for outcome in &self.outcomes {
            let key = outcome.key.as_deref().unwrap_or("-");
            match &outcome.verdict {
                Verdict::Matched => {}
                Verdict::Flagged(items) => {
                    let _ = writeln!(out, "\n[FLAGGED] {} (key {})", outcome.name, key);
                    for item in items {
                        let _ = writeln!(out, "  - {}", truncate(item, self.max_chars));
                    }
                }
                Verdict::Failed(error) => {
                    let _ = writeln!(out, "\n[FAILED] {} (key {})", outcome.name, key);
                    let _ = writeln!(out, "  {}", truncate(error, self.max_chars));
                }
            }
        }
        out
    }
}

/// Cut to `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push('…');
    cut
}
