//! Parse oracle output into a JSON object
//!
//! The oracle answers in free text. The object may be wrapped in a
//! ```` ```json ```` fence and may be followed by prose or a bold note.
//! The object ends at the first `}` that is followed by end of text, a
//! blank line, or a `**` marker *and* closes a parseable object; the last
//! `}` in the text is never taken blindly.

use crate::error::ExtractorError;
use ledgermail_domain::{ExtractionResult, FieldNames};
use serde_json::Value;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Extract the first well-terminated JSON object from oracle text
pub fn extract_json_object(response: &str) -> Result<Value, ExtractorError> {
    let text = strip_json_fence(response);

    let start = text
        .find('{')
        .ok_or_else(|| ExtractorError::Parse("No JSON object found in response".to_string()))?;

    let mut last_error = None;
    for (offset, _) in text[start..].match_indices('}') {
        let end = start + offset + 1;
        if !is_terminated(&text[end..]) {
            continue;
        }
        match serde_json::from_str::<Value>(&text[start..end]) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(ExtractorError::Parse(match last_error {
        Some(e) => format!("Invalid JSON object: {}", e),
        None => "No terminated JSON object found in response".to_string(),
    }))
}

/// Parse oracle text straight into an [`ExtractionResult`]
pub fn parse_extraction(
    response: &str,
    names: &FieldNames,
) -> Result<ExtractionResult, ExtractorError> {
    let value = extract_json_object(response)?;
    ExtractionResult::from_value(value, names)
        .ok_or_else(|| ExtractorError::Parse("Expected a JSON object".to_string()))
}

/// Keep only the body of a ```` ```json ```` block, if there is one
fn strip_json_fence(text: &str) -> &str {
    let Some(open) = text.find(JSON_FENCE) else {
        return text;
    };
    let body = &text[open + JSON_FENCE.len()..];
    match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Whether the text after a closing brace ends the object
fn is_terminated(rest: &str) -> bool {
    if rest.trim().is_empty() || rest.trim_start().starts_with("**") {
        return true;
    }
    let rest = rest.trim_start_matches([' ', '\t']);
    let Some(after_newline) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) else {
        return false;
    };
    after_newline
        .trim_start_matches([' ', '\t', '\r'])
        .starts_with('\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = extract_json_object(r#"{"isCreditMemo": true}"#).unwrap();
        assert_eq!(value, json!({"isCreditMemo": true}));
    }

    #[test]
    fn test_json_fence() {
        let response = "Here is the data:\n```json\n{\"a\": 1}\n```\nLet me know.";
        assert_eq!(extract_json_object(response).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_trailing_prose_after_blank_line() {
        let response = "{\"a\": {\"b\": 2}}\n\nNote: the total was read from page 2 {approx}.";
        assert_eq!(extract_json_object(response).unwrap(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_trailing_bold_note() {
        let response = "{\"a\": 1}**Note:** check the date}";
        assert_eq!(extract_json_object(response).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_does_not_take_last_brace() {
        // Taking the last brace would swallow the prose and fail to parse
        let response = "{\"a\": 1}\n\nThe memo mentions {\"b\": 2} in a footnote}";
        assert_eq!(extract_json_object(response).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_inner_brace_before_blank_line_in_string() {
        let response = "{\"note\": \"x}**y\", \"n\": 1}";
        assert_eq!(
            extract_json_object(response).unwrap(),
            json!({"note": "x}**y", "n": 1})
        );
    }

    #[test]
    fn test_pretty_printed_object() {
        let response = "```json\n{\n  \"lineItems\": [\n    {\"billNumber\": \"12345678\"}\n  ]\n}\n```";
        assert_eq!(
            extract_json_object(response).unwrap(),
            json!({"lineItems": [{"billNumber": "12345678"}]})
        );
    }

    #[test]
    fn test_no_object() {
        let result = extract_json_object("I could not read this document.");
        assert!(matches!(result, Err(ExtractorError::Parse(_))));
    }

    #[test]
    fn test_unterminated_object() {
        let result = extract_json_object("{\"a\": 1} and then more text");
        assert!(matches!(result, Err(ExtractorError::Parse(_))));
    }

    #[test]
    fn test_malformed_object() {
        let result = extract_json_object("{\"a\": 1,}");
        assert!(matches!(result, Err(ExtractorError::Parse(m)) if m.contains("Invalid JSON")));
    }

    #[test]
    fn test_parse_extraction_scenario_b() {
        let names = FieldNames::default();
        let result = parse_extraction(
            "```json\n{\"isCreditMemo\": false, \"lineItems\": [{\"billNumber\": \"1\"}]}\n```",
            &names,
        )
        .unwrap();
        assert!(!result.is_accepted_document_type);
        assert_eq!(result.to_json(&names)["lineItems"], json!([]));
    }

    fn json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 {}*_-]{0,10}".prop_map(Value::String),
        ]
    }

    fn json_object() -> impl Strategy<Value = Value> {
        let value = json_leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-zA-Z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        proptest::collection::btree_map("[a-zA-Z]{1,6}", value, 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_tolerates_suffix_and_fence(
            object in json_object(),
            suffix in prop_oneof![Just(""), Just("\n\n trailing note"), Just("\n\n**bold note**")],
            fenced in any::<bool>(),
        ) {
            let body = format!("{}{}", serde_json::to_string(&object).unwrap(), suffix);
            let response = if fenced {
                format!("```json\n{}\n```", body)
            } else {
                body
            };
            prop_assert_eq!(extract_json_object(&response).unwrap(), object);
        }
    }
}
