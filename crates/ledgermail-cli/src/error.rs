//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable is unset or empty
    #[error("Missing required environment variable {0}")]
    MissingEnv(String),

    /// A poll cycle could not read the mailbox
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Oracle client error
    #[error("Oracle error: {0}")]
    Oracle(#[from] ledgermail_llm::LlmError),

    /// Document store error
    #[error("Store error: {0}")]
    Store(#[from] ledgermail_store::StoreError),

    /// Mailbox error
    #[error("Mailbox error: {0}")]
    Mail(#[from] ledgermail_mail::MailError),

    /// Rule source error
    #[error("Rule source error: {0}")]
    Router(#[from] ledgermail_router::RouterError),

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] ledgermail_scheduler::SchedulerError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
