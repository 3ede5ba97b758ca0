//! In-memory routing rule registry.
//!
//! The list is never edited in place. Readers clone an `Arc` to the current
//! list and match against that snapshot; a refresh swaps in a whole new list
//! under the write lock, so no reader can observe a partially updated list.

use ledgermail_domain::{match_rule, RoutingRule};
use std::sync::{Arc, PoisonError, RwLock};

/// Holds the active, ordered rule list
#[derive(Debug)]
pub struct RuleRegistry {
    rules: RwLock<Arc<Vec<RoutingRule>>>,
}

impl RuleRegistry {
    /// Create a registry holding `rules`
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self {
            rules: RwLock::new(Arc::new(rules)),
        }
    }

    /// The current list. Later swaps do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<Vec<RoutingRule>> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the entire list, returning the previous one
    pub fn replace(&self, rules: Vec<RoutingRule>) -> Arc<Vec<RoutingRule>> {
        let mut guard = self.rules.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(rules))
    }

    /// First rule in list order matching the sender and subject
    pub fn find(&self, sender: &str, subject: &str) -> Option<RoutingRule> {
        match_rule(&self.snapshot(), sender, subject).cloned()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the registry holds no rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new(crate::default_rules())
    }
}
