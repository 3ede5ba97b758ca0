//! Built-in rules used until the first successful refresh

use ledgermail_domain::{Destination, RoutingRule};

/// Rules loaded at startup.
///
/// Prompt templates are left empty so the extractor's default credit-memo
/// prompt applies.
pub fn default_rules() -> Vec<RoutingRule> {
    vec![RoutingRule {
        name: "example-credits".to_string(),
        match_sender: "example.com".to_string(),
        match_subject: "Credits processed by Example".to_string(),
        enabled: true,
        prompt_template: String::new(),
        destination: Destination {
            primary_folder_id: "1001".to_string(),
            secondary_folder_id: Some("1002".to_string()),
        },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_domain::match_rule;

    #[test]
    fn test_default_rule_matches_credit_emails() {
        let rules = default_rules();
        let rule = match_rule(
            &rules,
            "no-replies@example.com",
            "Credits processed by Example for 123",
        )
        .unwrap();
        assert_eq!(rule.name, "example-credits");
        assert!(rule.prompt_template.is_empty());
    }
}
