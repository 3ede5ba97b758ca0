//! ledgermail Domain Layer
//!
//! Value types and trait seams shared by every other crate in the workspace.
//! Nothing in here performs I/O; infrastructure lives behind the traits in
//! [`traits`].
//!
//! ## Key Concepts
//!
//! - **RoutingRule**: (sender, subject) predicate selecting a prompt and a destination
//! - **RawDocument**: one PDF attachment plus the metadata of the message that carried it
//! - **ExtractionResult**: structured data parsed out of an oracle response
//! - **ValidationOutcome**: result of checking an extraction against a local rule
//! - **Oracle**: the external document-understanding service, seen as text in, text out

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod extraction;
pub mod oracle;
pub mod rule;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use document::{RawDocument, SourceMetadata};
pub use extraction::{ExtractionResult, FieldNames};
pub use oracle::{DocumentPart, OracleRequest, OracleResponse, TokenUsage};
pub use rule::{match_rule, Destination, RoutingRule};
pub use traits::{
    DocumentSink, DocumentUpload, ExtractionOracle, InboundMessage, MessageSource, RuleSource,
    SinkReceipt, TransactionLookup,
};
pub use validation::{InvalidItem, ValidationOutcome};
