//! ledgermail Oracle Client Layer
//!
//! Implementations of the `ExtractionOracle` trait from `ledgermail-domain`.
//!
//! # Providers
//!
//! - `MockOracle`: Scripted responses for testing
//! - `AnthropicOracle`: Messages API with a base64 PDF document part
//!
//! # Examples
//!
//! ```
//! use ledgermail_llm::MockOracle;
//! use ledgermail_domain::{ExtractionOracle, OracleRequest};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let oracle = MockOracle::new(r#"{"isCreditMemo": false}"#);
//! let request = OracleRequest { document: None, instructions: "extract", max_output_tokens: None };
//! let response = oracle.complete(&request).await.unwrap();
//! assert_eq!(response.text, r#"{"isCreditMemo": false}"#);
//! # }
//! ```

#![warn(missing_docs)]

pub mod anthropic;

use async_trait::async_trait;
use ledgermail_domain::{ExtractionOracle, OracleRequest, OracleResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use anthropic::{AnthropicConfig, AnthropicOracle};

/// Marker the oracle API puts in rate-limit error bodies
pub const RATE_LIMIT_MARKER: &str = "rate_limit_error";

/// Errors that can occur during oracle calls
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// Network or connection failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// Rate limit signalled by the API; the message always carries the marker
    #[error("rate_limit_error: {0}")]
    RateLimited(String),

    /// Non-success HTTP status other than a rate limit
    #[error("API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or error message
        message: String,
    },

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client misconfiguration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// Scripted oracle for deterministic tests
///
/// Returns queued responses in order, then the default response. Clones share
/// the same queue, call counter and recorded instructions.
///
/// # Examples
///
/// ```
/// use ledgermail_llm::{LlmError, MockOracle};
///
/// let oracle = MockOracle::new("fallback");
/// oracle.push_response("first");
/// oracle.push_error(LlmError::RateLimited("slow down".into()));
/// assert_eq!(oracle.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockOracle {
    default_response: String,
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockOracle {
    /// Create a mock returning `response` whenever the script is empty
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful response
    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(response.into()));
    }

    /// Queue an error
    pub fn push_error(&self, error: LlmError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Instructions received, in call order
    pub fn instructions(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl ExtractionOracle for MockOracle {
    type Error = LlmError;

    async fn complete(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, Self::Error> {
        self.calls
            .lock()
            .unwrap()
            .push(request.instructions.to_string());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(OracleResponse::text(text)),
            Some(Err(e)) => Err(e),
            None => Ok(OracleResponse::text(self.default_response.clone())),
        }
    }
}
