//! Validation outcomes

/// A line item that failed a field rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidItem {
    /// 0-based position in the line-items list
    pub index: usize,

    /// Offending value, or the empty marker when absent
    pub value: String,

    /// Character length of the offending value (0 when absent)
    pub length: usize,
}

/// Result of checking an extraction against a local rule.
///
/// Derived purely from an extraction; recomputed on every check, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationOutcome {
    /// Whether every checked item passed
    pub valid: bool,

    /// Human-readable diagnostic (empty when valid)
    pub reason: String,

    /// Failing items in list order
    pub invalid_items: Vec<InvalidItem>,
}

impl ValidationOutcome {
    /// An outcome with nothing to report
    pub fn passed() -> Self {
        Self {
            valid: true,
            reason: String::new(),
            invalid_items: Vec::new(),
        }
    }

    /// An outcome listing failing items
    pub fn failed(reason: impl Into<String>, invalid_items: Vec<InvalidItem>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
            invalid_items,
        }
    }

    /// 0-based indices of the failing items, ascending
    pub fn invalid_indices(&self) -> Vec<usize> {
        self.invalid_items.iter().map(|item| item.index).collect()
    }
}
