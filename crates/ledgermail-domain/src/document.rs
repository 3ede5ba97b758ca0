//! Raw documents as yielded by a document source

use serde::{Deserialize, Serialize};

/// Metadata of the message (or folder entry) a document came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Identifier of the containing message, stable across polls
    pub message_id: String,

    /// Sender address
    pub sender: String,

    /// Subject line
    pub subject: String,

    /// Message date (RFC 3339), when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// A document awaiting extraction.
///
/// Immutable once created. Each pipeline instance owns its document
/// exclusively and drops it after the sink step or on failure.
#[derive(Debug, Clone)]
pub struct RawDocument {
    bytes: Vec<u8>,
    original_filename: String,
    metadata: SourceMetadata,
}

impl RawDocument {
    /// Create a new document
    pub fn new(
        bytes: Vec<u8>,
        original_filename: impl Into<String>,
        metadata: SourceMetadata,
    ) -> Self {
        Self {
            bytes,
            original_filename: original_filename.into(),
            metadata,
        }
    }

    /// Document content
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Filename as it appeared in the source
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Metadata of the containing message
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Size of the document in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document has no content
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
