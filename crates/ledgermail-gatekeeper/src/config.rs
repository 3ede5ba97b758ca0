//! Gatekeeper configuration

use ledgermail_domain::FieldNames;
use serde::{Deserialize, Serialize};

/// Configuration for the bill-number rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Line-item key holding the bill number
    #[serde(default = "default_bill_number_field")]
    pub bill_number_field: String,

    /// Line-item key holding the secondary identifier shown in diagnostics
    #[serde(default = "default_secondary_field")]
    pub secondary_field: Option<String>,

    /// Required number of digits
    #[serde(default = "default_required_digits")]
    pub required_digits: usize,
}

fn default_bill_number_field() -> String {
    FieldNames::default().bill_number
}

fn default_secondary_field() -> Option<String> {
    Some(FieldNames::default().secondary_id)
}

fn default_required_digits() -> usize {
    8
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            bill_number_field: default_bill_number_field(),
            secondary_field: default_secondary_field(),
            required_digits: default_required_digits(),
        }
    }
}

impl ValidationConfig {
    /// Use the keys of an extraction schema
    pub fn from_field_names(names: &FieldNames) -> Self {
        Self {
            bill_number_field: names.bill_number.clone(),
            secondary_field: Some(names.secondary_id.clone()),
            required_digits: default_required_digits(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.bill_number_field, "billNumber");
        assert_eq!(config.secondary_field.as_deref(), Some("nardaCode"));
        assert_eq!(config.required_digits, 8);
    }

    #[test]
    fn test_from_field_names() {
        let names = FieldNames {
            bill_number: "bill".to_string(),
            secondary_id: "code".to_string(),
            ..Default::default()
        };
        let config = ValidationConfig::from_field_names(&names);
        assert_eq!(config.bill_number_field, "bill");
        assert_eq!(config.secondary_field.as_deref(), Some("code"));
    }
}
