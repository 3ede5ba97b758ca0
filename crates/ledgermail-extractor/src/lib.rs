//! ledgermail Extractor
//!
//! Turns PDF documents into validated JSON using an external oracle, and
//! later reconciles the resulting transactions against their sources.
//!
//! # Architecture
//!
//! ```text
//! RawDocument → prompt → Oracle → Parser → Gatekeeper ─ok→ Sink
//!                          ↑                    │
//!                          └── corrective ──────┘ (once)
//! ```
//!
//! # Key Features
//!
//! - **Tolerant parsing**: JSON fences, trailing prose and bold notes are ignored
//! - **Transport retry**: rate-limited calls are retried with exponential backoff
//! - **Validation retry**: one corrective prompt when the bill-number rule fails;
//!   the second result is kept even if still invalid, and flagged
//! - **Per-item isolation**: [`DocumentPipeline::process`] never fails, it
//!   returns an [`ItemOutcome`]
//! - **Reconciliation**: [`TransactionReconciler`] compares booked transactions
//!   with archived documents
//!
//! # Example Usage
//!
//! ```no_run
//! use ledgermail_extractor::{Extractor, ExtractorConfig};
//! use ledgermail_domain::{RawDocument, SourceMetadata};
//! use ledgermail_llm::MockOracle;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let oracle = Arc::new(MockOracle::new(r#"{"isCreditMemo": true, "lineItems": []}"#));
//! let extractor = Extractor::new(oracle, ExtractorConfig::default());
//!
//! let document = RawDocument::new(std::fs::read("memo.pdf")?, "memo.pdf", SourceMetadata::default());
//! let extraction = extractor.extract(&document, "Extract the credit memo").await?;
//!
//! println!("Valid: {}", extraction.validation.valid);
//! println!("Attempts: {}", extraction.validation_attempts);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
mod parser;
mod pipeline;
mod prompt;
mod reconcile;
mod retry;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::{Extraction, Extractor};
pub use parser::{extract_json_object, parse_extraction};
pub use pipeline::{DocumentPipeline, FailureStage, ItemOutcome, ItemStatus, META_KEY};
pub use prompt::{
    corrective_prompt, reconcile_prompt, render_instructions, DEFAULT_EXTRACTION_PROMPT,
};
pub use reconcile::{
    ArchivedDocument, ReconcileConfig, ReconcileOutcome, ReconcileReport, TransactionReconciler,
    Verdict,
};
pub use retry::{backoff_delay, is_rate_limited, Retried, TransportFailure, TransportPolicy};
