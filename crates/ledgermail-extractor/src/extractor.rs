//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_extraction;
use crate::prompt::corrective_prompt;
use crate::retry::{Retried, TransportFailure, TransportPolicy};
use ledgermail_domain::{
    DocumentPart, ExtractionOracle, ExtractionResult, FieldNames, OracleRequest, RawDocument,
    ValidationOutcome,
};
use ledgermail_gatekeeper::BillNumberRule;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Final data for one document after both retry paths ran
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The accepted result (the second attempt's when one was made)
    pub result: ExtractionResult,

    /// Validation of `result`
    pub validation: ValidationOutcome,

    /// Oracle prompts issued for validation purposes (1 or 2)
    pub validation_attempts: u32,

    /// Rate-limit retries across all prompts
    pub transport_retries: u32,

    /// Set when the accepted result still carries a validation problem
    pub concern: Option<String>,
}

/// Turns a document into validated structured data using the oracle.
///
/// Two retry budgets are tracked separately per document: rate-limit retries
/// of the same prompt (see [`TransportPolicy`]), and at most one corrective
/// prompt when the first result fails validation.
pub struct Extractor<O>
where
    O: ExtractionOracle,
{
    oracle: Arc<O>,
    rule: BillNumberRule,
    transport: TransportPolicy,
    config: ExtractorConfig,
}

impl<O> Extractor<O>
where
    O: ExtractionOracle,
{
    /// Create a new Extractor
    pub fn new(oracle: Arc<O>, config: ExtractorConfig) -> Self {
        Self {
            rule: BillNumberRule::new(config.validation()),
            transport: TransportPolicy::from_config(&config),
            oracle,
            config,
        }
    }

    /// Field names in use
    pub fn fields(&self) -> &FieldNames {
        &self.config.fields
    }

    /// Extract and validate one document with the given instructions.
    ///
    /// # Errors
    ///
    /// Fails when the first attempt cannot produce a parseable result (oracle
    /// error, exhausted rate-limit retries, or unparseable output). A failed
    /// corrective attempt is not an error: the first result is kept and
    /// flagged instead.
    pub async fn extract(
        &self,
        document: &RawDocument,
        instructions: &str,
    ) -> Result<Extraction, ExtractorError> {
        let first = self.attempt(document, instructions).await?;
        let validation = self.rule.validate(&first.value);

        if validation.valid {
            debug!("{}: passed validation", document.original_filename());
            return Ok(Extraction {
                result: first.value,
                validation,
                validation_attempts: 1,
                transport_retries: first.retries,
                concern: None,
            });
        }

        warn!(
            "{}: validation failed, retrying with correction: {}",
            document.original_filename(),
            validation.reason
        );

        let corrective = corrective_prompt(&self.rule.description(), &validation.reason, instructions);

        match self.attempt(document, &corrective).await {
            Ok(second) => {
                let second_validation = self.rule.validate(&second.value);
                let concern = if second_validation.valid {
                    info!("{}: corrected on second attempt", document.original_filename());
                    None
                } else {
                    warn!(
                        "{}: still invalid after correction, keeping second result",
                        document.original_filename()
                    );
                    Some(format!(
                        "Bill number validation failed after retry: {}",
                        second_validation.reason
                    ))
                };

                Ok(Extraction {
                    result: second.value,
                    validation: second_validation,
                    validation_attempts: 2,
                    transport_retries: first.retries + second.retries,
                    concern,
                })
            }
            Err(e) => {
                warn!(
                    "{}: corrective attempt failed ({}), keeping first result",
                    document.original_filename(),
                    e
                );
                let concern = Some(format!(
                    "Bill number validation failed and the corrective attempt errored ({}): {}",
                    e, validation.reason
                ));
                Ok(Extraction {
                    result: first.value,
                    validation,
                    validation_attempts: 2,
                    transport_retries: first.retries,
                    concern,
                })
            }
        }
    }

    /// One prompt variant: transport retries, then parse. Parse failures are
    /// not retried.
    async fn attempt(
        &self,
        document: &RawDocument,
        instructions: &str,
    ) -> Result<Retried<ExtractionResult>, ExtractorError> {
        let request = OracleRequest {
            document: Some(DocumentPart::pdf(document.bytes())),
            instructions,
            max_output_tokens: self.config.max_output_tokens,
        };

        let response = self
            .transport
            .run(|_| self.oracle.complete(&request))
            .await
            .map_err(oracle_failure)?;

        debug!("Oracle response length: {} chars", response.value.text.len());

        let result = parse_extraction(&response.value.text, &self.config.fields)?;
        Ok(Retried {
            value: result,
            retries: response.retries,
        })
    }
}

/// Map a finished retry loop to an extractor error
pub(crate) fn oracle_failure<E: std::fmt::Display>(failure: TransportFailure<E>) -> ExtractorError {
    if failure.rate_limited {
        ExtractorError::RateLimited {
            attempts: failure.attempts,
            message: failure.error.to_string(),
        }
    } else {
        ExtractorError::Oracle(failure.error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_domain::SourceMetadata;
    use ledgermail_llm::{LlmError, MockOracle};
    use std::time::Duration;
    use tokio::time::Instant;

    const VALID: &str = r#"{"isCreditMemo": true, "lineItems": [{"billNumber": "12345678", "nardaCode": "N1"}]}"#;
    const SHORT: &str = r#"{"isCreditMemo": true, "lineItems": [{"billNumber": "1234567", "nardaCode": "N1"}]}"#;
    const STILL_SHORT: &str = r#"{"isCreditMemo": true, "lineItems": [{"billNumber": "123456", "nardaCode": "N1"}]}"#;

    fn document() -> RawDocument {
        RawDocument::new(b"%PDF-1.4".to_vec(), "memo.pdf", SourceMetadata::default())
    }

    fn extractor(oracle: &MockOracle) -> Extractor<MockOracle> {
        Extractor::new(Arc::new(oracle.clone()), ExtractorConfig::default())
    }

    #[tokio::test]
    async fn test_valid_first_attempt() {
        let oracle = MockOracle::new(VALID);
        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert!(extraction.validation.valid);
        assert_eq!(extraction.validation_attempts, 1);
        assert!(extraction.concern.is_none());
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_corrected_on_second_attempt() {
        let oracle = MockOracle::new(VALID);
        oracle.push_response(SHORT);

        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert!(extraction.validation.valid);
        assert_eq!(extraction.validation_attempts, 2);
        assert!(extraction.concern.is_none());
        assert_eq!(extraction.result.line_items[0]["billNumber"], "12345678");

        let prompts = oracle.instructions();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].starts_with("IMPORTANT"));
        assert!(prompts[1].contains("Line 1 (NARDA N1): bill number \"1234567\" has 7 digits"));
        assert!(prompts[1].ends_with("extract"));
    }

    #[tokio::test]
    async fn test_at_most_two_validation_attempts() {
        let oracle = MockOracle::new(SHORT);
        oracle.push_response(SHORT);
        oracle.push_response(STILL_SHORT);

        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert_eq!(oracle.call_count(), 2);
        assert_eq!(extraction.validation_attempts, 2);
        assert!(!extraction.validation.valid);
        // The second attempt's data is what gets kept
        assert_eq!(extraction.result.line_items[0]["billNumber"], "123456");
        assert!(extraction.concern.unwrap().contains("has 6 digits"));
    }

    #[tokio::test]
    async fn test_corrective_failure_keeps_first_result() {
        let oracle = MockOracle::new(VALID);
        oracle.push_response(SHORT);
        oracle.push_error(LlmError::Communication("connection reset".into()));

        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert_eq!(extraction.result.line_items[0]["billNumber"], "1234567");
        assert!(!extraction.validation.valid);
        assert!(extraction.concern.unwrap().contains("corrective attempt errored"));
    }

    #[tokio::test]
    async fn test_parse_failure_not_retried() {
        let oracle = MockOracle::new("Sorry, I cannot read this file.");
        let result = extractor(&oracle).extract(&document(), "extract").await;

        assert!(matches!(result, Err(ExtractorError::Parse(_))));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_rate_limit_error_not_retried() {
        let oracle = MockOracle::new(VALID);
        oracle.push_error(LlmError::Api {
            status: 500,
            message: "internal".into(),
        });

        let result = extractor(&oracle).extract(&document(), "extract").await;
        assert!(matches!(result, Err(ExtractorError::Oracle(_))));
        assert_eq!(oracle.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_then_success() {
        let oracle = MockOracle::new(VALID);
        oracle.push_error(LlmError::RateLimited("too many requests".into()));
        oracle.push_error(LlmError::RateLimited("too many requests".into()));

        let start = Instant::now();
        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert_eq!(oracle.call_count(), 3);
        assert_eq!(extraction.transport_retries, 2);
        assert_eq!(extraction.validation_attempts, 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausted() {
        let oracle = MockOracle::new(VALID);
        for _ in 0..3 {
            oracle.push_error(LlmError::RateLimited("too many requests".into()));
        }

        let result = extractor(&oracle).extract(&document(), "extract").await;
        assert!(matches!(result, Err(ExtractorError::RateLimited { attempts: 3, .. })));
        assert_eq!(oracle.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budgets_are_independent() {
        // Rate limited once on each validation attempt
        let oracle = MockOracle::new(VALID);
        oracle.push_error(LlmError::RateLimited("a".into()));
        oracle.push_response(SHORT);
        oracle.push_error(LlmError::RateLimited("b".into()));
        oracle.push_response(VALID);

        let extraction = extractor(&oracle).extract(&document(), "extract").await.unwrap();

        assert_eq!(oracle.call_count(), 4);
        assert_eq!(extraction.validation_attempts, 2);
        assert_eq!(extraction.transport_retries, 2);
        assert!(extraction.validation.valid);
    }
}
