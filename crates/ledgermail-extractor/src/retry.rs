//! Transport-level retry with exponential backoff
//!
//! Only rate-limit failures are retried, detected by the marker substring in
//! the error message. Every other error is returned on the first occurrence.

use crate::ExtractorConfig;
use ledgermail_llm::RATE_LIMIT_MARKER;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Whether an error message signals a rate limit
pub fn is_rate_limited(message: &str) -> bool {
    message.contains(RATE_LIMIT_MARKER)
}

/// Delay before retrying after failed attempt `attempt` (0-based): `2^attempt * base`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// A value together with the number of retries it took
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    /// The successful result
    pub value: T,
    /// Retries before success (0 when the first call succeeded)
    pub retries: u32,
}

/// The error that ended a retry loop
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure<E> {
    /// The last error
    pub error: E,
    /// Calls made, including the first
    pub attempts: u32,
    /// Whether the last error was a rate limit (so the cap was reached)
    pub rate_limited: bool,
}

/// Attempt cap and backoff base for transport retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl TransportPolicy {
    /// Create a policy; `max_attempts` is at least 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy from extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self::new(config.max_transport_attempts, config.backoff_base())
    }

    /// Attempt cap
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Call `op` until it succeeds, fails with a non-rate-limit error, or the
    /// attempt cap is reached. `op` receives the 0-based attempt number.
    ///
    /// There is no sleep after the final failed attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<Retried<T>, TransportFailure<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        retries: attempt,
                    })
                }
                Err(error) => {
                    let rate_limited = is_rate_limited(&error.to_string());
                    if !rate_limited || attempt + 1 >= self.max_attempts {
                        return Err(TransportFailure {
                            error,
                            attempts: attempt + 1,
                            rate_limited,
                        });
                    }

                    let delay = backoff_delay(self.base_delay, attempt);
                    warn!(
                        "Rate limited on attempt {}/{}, retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
