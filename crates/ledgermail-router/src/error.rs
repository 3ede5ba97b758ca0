//! Error types for rule fetching

use thiserror::Error;

/// Errors from a rule source
#[derive(Debug, Error)]
pub enum RouterError {
    /// Network or HTTP failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The source answered but reported failure
    #[error("Rule source rejected request: {0}")]
    Rejected(String),

    /// The response could not be understood
    #[error("Malformed rule response: {0}")]
    Malformed(String),

    /// Client misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),
}
