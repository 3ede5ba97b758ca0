//! Structured results extracted from oracle output

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON keys the extraction prompt asks the oracle to use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Boolean flag telling whether the document is of the accepted type
    pub accepted_flag: String,

    /// Array of line items
    pub line_items: String,

    /// Bill number inside each line item
    pub bill_number: String,

    /// Secondary identifier inside each line item (NARDA code)
    pub secondary_id: String,

    /// Free-text validation note the oracle may report
    pub validation_error: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            accepted_flag: "isCreditMemo".to_string(),
            line_items: "lineItems".to_string(),
            bill_number: "billNumber".to_string(),
            secondary_id: "nardaCode".to_string(),
            validation_error: "validationError".to_string(),
        }
    }
}

/// Data extracted from one document.
///
/// Invariant: when `is_accepted_document_type` is false, `line_items` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Whether the oracle recognised the document as the accepted type
    pub is_accepted_document_type: bool,

    /// Header-level fields (everything except the flag and the line items)
    pub fields: Map<String, Value>,

    /// Line items, each normally a JSON object
    pub line_items: Vec<Value>,

    /// Validation note reported by the oracle itself, if any
    pub validation_error: Option<String>,
}

impl ExtractionResult {
    /// Build a result from a parsed oracle response.
    ///
    /// Returns `None` when the value is not a JSON object. A missing accepted
    /// flag counts as accepted, so prompts that do not classify documents
    /// still yield their line items.
    pub fn from_value(value: Value, names: &FieldNames) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };

        let is_accepted_document_type = fields
            .remove(&names.accepted_flag)
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let line_items = match fields.remove(&names.line_items) {
            Some(Value::Array(items)) if is_accepted_document_type => items,
            _ => Vec::new(),
        };

        let validation_error = match fields.remove(&names.validation_error) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        Some(Self {
            is_accepted_document_type,
            fields,
            line_items,
            validation_error,
        })
    }

    /// Render back to JSON for persistence.
    ///
    /// The line-items key is always present as an array, never null.
    pub fn to_json(&self, names: &FieldNames) -> Value {
        let mut out = self.fields.clone();
        out.insert(
            names.accepted_flag.clone(),
            Value::Bool(self.is_accepted_document_type),
        );
        out.insert(
            names.line_items.clone(),
            Value::Array(self.line_items.clone()),
        );
        if let Some(err) = &self.validation_error {
            out.insert(names.validation_error.clone(), Value::String(err.clone()));
        }
        Value::Object(out)
    }

    /// Look up a header field as text
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}
