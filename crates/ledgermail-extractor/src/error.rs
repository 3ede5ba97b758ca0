//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur while extracting or reconciling a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Oracle call failed with an error that is not retried
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Oracle kept signalling a rate limit until the attempt cap was reached
    #[error("Rate limited after {attempts} attempts: {message}")]
    RateLimited {
        /// Calls made, including the first
        attempts: u32,
        /// Last error message
        message: String,
    },

    /// Oracle response held no recoverable JSON object
    #[error("Parse error: {0}")]
    Parse(String),

    /// Document sink rejected or failed the upload
    #[error("Sink error: {0}")]
    Sink(String),

    /// Transaction lookup failed
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::Parse(e.to_string())
    }
}
