//! ledgermail Gatekeeper
//!
//! Local checks on extracted data. The oracle is trusted for everything except
//! the rules implemented here.
//!
//! The Gatekeeper provides:
//! - Bill-number format validation (exactly 8 ASCII digits per line item)
//! - A diagnostic string suitable for feeding back to the oracle
//!
//! # Examples
//!
//! ```
//! use ledgermail_domain::{ExtractionResult, FieldNames};
//! use ledgermail_gatekeeper::{BillNumberRule, ValidationConfig};
//! use serde_json::json;
//!
//! let names = FieldNames::default();
//! let extraction = ExtractionResult::from_value(
//!     json!({"lineItems": [{"billNumber": "1234567"}]}),
//!     &names,
//! ).unwrap();
//!
//! let rule = BillNumberRule::new(ValidationConfig::from_field_names(&names));
//! let outcome = rule.validate(&extraction);
//! assert!(!outcome.valid);
//! assert_eq!(outcome.invalid_indices(), vec![0]);
//! ```

#![warn(missing_docs)]

mod config;
mod validator;

pub use config::ValidationConfig;
pub use validator::{BillNumberRule, EMPTY_MARKER};
