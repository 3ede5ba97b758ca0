//! Bill-number validation

use crate::ValidationConfig;
use ledgermail_domain::{ExtractionResult, InvalidItem, ValidationOutcome};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Shown in place of a missing or empty bill number
pub const EMPTY_MARKER: &str = "(empty)";

// ASCII only; `\d` would accept other Unicode digits
static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("digit pattern is valid"));

/// Checks that every line item carries a bill number of exactly N ASCII digits
#[derive(Debug, Clone)]
pub struct BillNumberRule {
    config: ValidationConfig,
}

impl BillNumberRule {
    /// Create a rule with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a rule with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Required digit count
    pub fn required_digits(&self) -> usize {
        self.config.required_digits
    }

    /// One-line statement of the rule, used in corrective prompts
    pub fn description(&self) -> String {
        format!(
            "Every line item's \"{}\" must be exactly {} digits (0-9), with no letters, spaces or punctuation.",
            self.config.bill_number_field, self.config.required_digits
        )
    }

    /// Validate an extraction.
    ///
    /// An absent or empty line-items list is valid: there is nothing to check.
    pub fn validate(&self, extraction: &ExtractionResult) -> ValidationOutcome {
        let mut invalid = Vec::new();
        let mut messages = Vec::new();

        for (index, item) in extraction.line_items.iter().enumerate() {
            let value = item
                .get(&self.config.bill_number_field)
                .and_then(value_text)
                .filter(|s| !s.trim().is_empty());

            if let Some(v) = &value {
                if self.is_valid_number(v) {
                    continue;
                }
            }

            let (shown, length) = match value {
                Some(v) => {
                    let len = v.chars().count();
                    (v, len)
                }
                None => (EMPTY_MARKER.to_string(), 0),
            };

            messages.push(self.describe_failure(index, item, &shown, length));
            invalid.push(InvalidItem {
                index,
                value: shown,
                length,
            });
        }

        if invalid.is_empty() {
            ValidationOutcome::passed()
        } else {
            ValidationOutcome::failed(messages.join("; "), invalid)
        }
    }

    fn is_valid_number(&self, value: &str) -> bool {
        value.len() == self.config.required_digits && DIGITS.is_match(value)
    }

    fn describe_failure(&self, index: usize, item: &Value, value: &str, length: usize) -> String {
        let secondary = self
            .config
            .secondary_field
            .as_ref()
            .and_then(|field| item.get(field))
            .and_then(value_text)
            .filter(|s| !s.trim().is_empty());

        match secondary {
            Some(id) => format!(
                "Line {} (NARDA {}): bill number \"{}\" has {} digits, expected {}",
                index + 1,
                id,
                value,
                length,
                self.config.required_digits
            ),
            None => format!(
                "Line {}: bill number \"{}\" has {} digits, expected {}",
                index + 1,
                value,
                length,
                self.config.required_digits
            ),
        }
    }
}

/// Text form of a JSON scalar; null counts as absent
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_domain::FieldNames;
    use proptest::prelude::*;
    use serde_json::json;

    fn extraction(value: Value) -> ExtractionResult {
        ExtractionResult::from_value(value, &FieldNames::default()).unwrap()
    }

    #[test]
    fn test_all_valid() {
        let rule = BillNumberRule::default_config();
        let outcome = rule.validate(&extraction(json!({
            "lineItems": [
                {"billNumber": "12345678", "nardaCode": "A1"},
                {"billNumber": "00000001", "nardaCode": "A2"}
            ]
        })));

        assert!(outcome.valid);
        assert!(outcome.reason.is_empty());
        assert!(outcome.invalid_items.is_empty());
    }

    #[test]
    fn test_collects_every_failing_index() {
        let rule = BillNumberRule::default_config();
        let outcome = rule.validate(&extraction(json!({
            "lineItems": [
                {"billNumber": "12345678"},
                {"billNumber": "1234567", "nardaCode": "NC-9"},
                {"nardaCode": "NC-10"},
                {"billNumber": "12345678"},
                {"billNumber": "1234567X"},
                {"billNumber": ""}
            ]
        })));

        assert!(!outcome.valid);
        assert_eq!(outcome.invalid_indices(), vec![1, 2, 4, 5]);
        assert_eq!(outcome.invalid_items[0].value, "1234567");
        assert_eq!(outcome.invalid_items[0].length, 7);
        assert_eq!(outcome.invalid_items[1].value, EMPTY_MARKER);
        assert_eq!(outcome.invalid_items[1].length, 0);
    }

    #[test]
    fn test_reason_format() {
        let rule = BillNumberRule::default_config();
        let outcome = rule.validate(&extraction(json!({
            "lineItems": [
                {"billNumber": "1234567", "nardaCode": "NC-9"},
                {"billNumber": null}
            ]
        })));

        assert_eq!(
            outcome.reason,
            "Line 1 (NARDA NC-9): bill number \"1234567\" has 7 digits, expected 8; \
             Line 2: bill number \"(empty)\" has 0 digits, expected 8"
        );
    }

    #[test]
    fn test_numeric_json_value() {
        let rule = BillNumberRule::default_config();
        let ok = rule.validate(&extraction(json!({"lineItems": [{"billNumber": 12345678}]})));
        assert!(ok.valid);

        let short = rule.validate(&extraction(json!({"lineItems": [{"billNumber": 1234}]})));
        assert!(!short.valid);
        assert_eq!(short.invalid_items[0].value, "1234");
    }

    #[test]
    fn test_unicode_digits_rejected() {
        let rule = BillNumberRule::default_config();
        // Arabic-Indic digits
        let outcome = rule.validate(&extraction(json!({
            "lineItems": [{"billNumber": "١٢٣٤٥٦٧٨"}]
        })));
        assert!(!outcome.valid);
        assert_eq!(outcome.invalid_items[0].length, 8);
    }

    #[test]
    fn test_empty_or_missing_line_items_valid() {
        let rule = BillNumberRule::default_config();

        assert!(rule.validate(&extraction(json!({}))).valid);
        assert!(rule.validate(&extraction(json!({"lineItems": []}))).valid);
        assert!(rule
            .validate(&extraction(json!({"lineItems": null, "total": "-99"})))
            .valid);
    }

    #[test]
    fn test_description_mentions_rule() {
        let rule = BillNumberRule::default_config();
        assert!(rule.description().contains("exactly 8 digits"));
    }

    proptest! {
        #[test]
        fn prop_eight_digit_numbers_pass(numbers in proptest::collection::vec("[0-9]{8}", 0..10)) {
            let items: Vec<Value> = numbers.iter().map(|n| json!({"billNumber": n})).collect();
            let outcome = BillNumberRule::default_config()
                .validate(&extraction(json!({"lineItems": items})));
            prop_assert!(outcome.valid);
        }

        #[test]
        fn prop_invalid_indices_are_exact(
            entries in proptest::collection::vec(
                prop_oneof!["[0-9]{8}", "[0-9]{0,7}", "[0-9]{9,12}", "[0-9]{4}[A-Z][0-9]{3}"],
                1..12,
            )
        ) {
            let items: Vec<Value> = entries.iter().map(|n| json!({"billNumber": n})).collect();
            let expected: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, n)| !(n.len() == 8 && n.bytes().all(|b| b.is_ascii_digit())))
                .map(|(i, _)| i)
                .collect();

            let outcome = BillNumberRule::default_config()
                .validate(&extraction(json!({"lineItems": items})));
            prop_assert_eq!(outcome.valid, expected.is_empty());
            prop_assert_eq!(outcome.invalid_indices(), expected);
        }
    }
}
