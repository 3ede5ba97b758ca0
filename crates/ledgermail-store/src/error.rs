//! Error types for document storage

use thiserror::Error;

/// Errors from the document store or local archive
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network or HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The store answered but reported failure
    #[error("Store rejected request: {0}")]
    Rejected(String),

    /// The store's response could not be understood
    #[error("Malformed store response: {0}")]
    Malformed(String),

    /// Local archive I/O failure
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Derived JSON could not be serialized or read back
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}
