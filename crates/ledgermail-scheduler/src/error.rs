//! Error types for scheduler operations

use thiserror::Error;

/// Errors that can occur while scheduling work
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (signal handling, runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
