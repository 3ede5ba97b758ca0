//! Rules command implementation.

use crate::app;
use crate::cli::RulesArgs;
use crate::config::{AppConfig, Env};
use crate::error::{CliError, Result};
use ledgermail_domain::RoutingRule;
use ledgermail_router::RefreshOutcome;

/// Execute the rules command.
pub async fn execute_rules(args: RulesArgs, config: &AppConfig, env: &Env) -> Result<()> {
    let registry = app::registry();

    if args.refresh {
        let refresher = app::refresher(config, env, registry.clone())?.ok_or_else(|| {
            CliError::Config("--refresh needs rules.url in the configuration".to_string())
        })?;
        match refresher.refresh_once().await {
            RefreshOutcome::Replaced { count } => eprintln!("Fetched {} rules", count),
            RefreshOutcome::KeptEmpty => eprintln!("Source had no enabled rules; showing built-in rules"),
            RefreshOutcome::KeptOnError(e) => eprintln!("Refresh failed ({}); showing built-in rules", e),
        }
    }

    println!("{}", render_rules(&registry.snapshot()));
    Ok(())
}

/// One block per rule, in match order
pub fn render_rules(rules: &[RoutingRule]) -> String {
    if rules.is_empty() {
        return "No routing rules".to_string();
    }

    rules
        .iter()
        .enumerate()
        .map(|(i, rule)| {
            let prompt = if rule.prompt_template.trim().is_empty() {
                "default".to_string()
            } else {
                format!("custom ({} chars)", rule.prompt_template.chars().count())
            };
            format!(
                "{}. {}{}\n   sender contains:  {}\n   subject contains: {}\n   folders: {} / {}\n   prompt: {}",
                i + 1,
                rule.name,
                if rule.enabled { "" } else { " (disabled)" },
                rule.match_sender,
                rule.match_subject,
                rule.destination.primary_folder_id,
                rule.destination.secondary_folder_id.as_deref().unwrap_or("-"),
                prompt
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermail_router::default_rules;

    #[test]
    fn test_render_default_rules() {
        let text = render_rules(&default_rules());
        assert!(text.starts_with("1. example-credits"));
        assert!(text.contains("sender contains:  example.com"));
        assert!(text.contains("folders: 1001 / 1002"));
        assert!(text.contains("prompt: default"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_rules(&[]), "No routing rules");
    }

    #[tokio::test]
    async fn test_refresh_without_source_is_config_error() {
        let result =
            execute_rules(RulesArgs { refresh: true }, &AppConfig::default(), &Env::default()).await;
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
