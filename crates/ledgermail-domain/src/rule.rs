//! Routing rules - which prompt and destination a message gets

use serde::{Deserialize, Serialize};

/// Where accepted documents are filed in the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Folder receiving the PDF (and JSON when no secondary folder is set)
    pub primary_folder_id: String,

    /// Optional folder receiving the derived JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_folder_id: Option<String>,
}

/// A (sender, subject) predicate mapping an inbound message to a prompt variant
/// and a destination.
///
/// Rules are value objects. A rule list is never edited in place; a refresh
/// replaces the whole list, and list order decides which rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingRule {
    /// Display name or remote identifier
    pub name: String,

    /// Substring that must appear in the sender address
    pub match_sender: String,

    /// Substring that must appear in the subject line
    pub match_subject: String,

    /// Disabled rules never match
    pub enabled: bool,

    /// Extraction instructions handed to the oracle for matching documents
    pub prompt_template: String,

    /// Destination folders
    pub destination: Destination,
}

impl RoutingRule {
    /// Whether this rule accepts the given sender and subject.
    ///
    /// Both substrings must be present. Comparison ignores ASCII case.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledgermail_domain::{Destination, RoutingRule};
    ///
    /// let rule = RoutingRule {
    ///     name: "credits".into(),
    ///     match_sender: "example.com".into(),
    ///     match_subject: "Credits processed".into(),
    ///     enabled: true,
    ///     prompt_template: String::new(),
    ///     destination: Destination { primary_folder_id: "1".into(), secondary_folder_id: None },
    /// };
    /// assert!(rule.matches("no-replies@Example.com", "Credits processed by Example"));
    /// assert!(!rule.matches("someone@other.org", "Credits processed by Example"));
    /// ```
    pub fn matches(&self, sender: &str, subject: &str) -> bool {
        self.enabled
            && contains_ignore_ascii_case(sender, &self.match_sender)
            && contains_ignore_ascii_case(subject, &self.match_subject)
    }
}

/// Select the first rule, in list order, that matches both predicates.
///
/// Pure function over the list; later rules are never consulted once an
/// earlier one matches.
pub fn match_rule<'a>(
    rules: &'a [RoutingRule],
    sender: &str,
    subject: &str,
) -> Option<&'a RoutingRule> {
    rules.iter().find(|rule| rule.matches(sender, subject))
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}
