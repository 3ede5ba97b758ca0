//! Error types for the mailbox

use thiserror::Error;

/// Errors reading or checkpointing messages
#[derive(Debug, Error)]
pub enum MailError {
    /// The message is not parseable RFC 822
    #[error("Failed to parse message {id}: {reason}")]
    Parse {
        /// Mailbox identifier of the message
        id: String,
        /// What went wrong
        reason: String,
    },

    /// A checkpoint referred to a message the mailbox does not hold
    #[error("Unknown message: {0}")]
    UnknownMessage(String),

    /// Spool directory I/O failure
    #[error("Mailbox I/O error: {0}")]
    Io(#[from] std::io::Error),
}
