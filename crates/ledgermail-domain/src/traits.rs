//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Implementations live in other crates (`ledgermail-llm`, `ledgermail-store`,
//! `ledgermail-router`, `ledgermail-mail`).

use crate::{Destination, OracleRequest, OracleResponse, RoutingRule};
use async_trait::async_trait;
use serde_json::Value;

/// Document-understanding oracle
///
/// Implemented by the infrastructure layer (ledgermail-llm)
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Error type for oracle calls. Its `Display` text is inspected for
    /// rate-limit signals.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send one request and return the raw response text
    async fn complete(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, Self::Error>;
}

/// A document and its derived JSON on their way to the store
#[derive(Debug, Clone, Copy)]
pub struct DocumentUpload<'a> {
    /// Document content
    pub bytes: &'a [u8],

    /// Filename as it appeared in the source; sinks add their own prefix
    pub original_filename: &'a str,

    /// Derived JSON, if any
    pub derived_json: Option<&'a Value>,

    /// Destination folders
    pub destination: &'a Destination,
}

/// Identifiers assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    /// Identifier of the stored document
    pub primary_file_id: String,

    /// Identifier of the stored JSON, when one was written
    pub secondary_file_id: Option<String>,
}

/// Persists accepted documents
///
/// Implemented by the infrastructure layer (ledgermail-store)
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Error type for sink operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a document and its derived JSON
    async fn persist(&self, upload: &DocumentUpload<'_>) -> Result<SinkReceipt, Self::Error>;
}

/// Authoritative source of routing rules
///
/// Implemented by the infrastructure layer (ledgermail-router)
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Error type for fetches. Unsuccessful or malformed responses are errors.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the complete, ordered rule list
    async fn fetch_rules(&self) -> Result<Vec<RoutingRule>, Self::Error>;
}

/// A message as delivered by the mailbox, not yet parsed
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Identifier used to checkpoint the message
    pub id: String,

    /// RFC 822 bytes
    pub raw: Vec<u8>,
}

/// Mailbox yielding messages that arrived since the last checkpoint
///
/// Methods take `&mut self`: a mailbox connection is exclusively owned and
/// never used concurrently with itself.
#[async_trait]
pub trait MessageSource: Send {
    /// Error type for mailbox operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Messages not yet checkpointed, oldest first
    async fn fetch_new(&mut self) -> Result<Vec<InboundMessage>, Self::Error>;

    /// Advance the checkpoint past a message
    async fn mark_processed(&mut self, id: &str) -> Result<(), Self::Error>;
}

/// Record search in the back-office system
///
/// Implemented by the infrastructure layer (ledgermail-store)
#[async_trait]
pub trait TransactionLookup: Send + Sync {
    /// Error type for lookups
    type Error: std::error::Error + Send + Sync + 'static;

    /// Find the first transaction whose `field` equals `value`
    async fn find_transaction(&self, field: &str, value: &str)
        -> Result<Option<Value>, Self::Error>;
}
