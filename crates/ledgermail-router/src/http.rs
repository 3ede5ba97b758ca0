//! Remote rule source reached over HTTP
//!
//! Calls `GET {url}?action=getConfigs` and expects:
//!
//! ```json
//! {
//!   "success": true,
//!   "configs": [
//!     {
//!       "name": "credits",
//!       "senderMatch": "example.com",
//!       "subjectMatch": "Credits processed",
//!       "prompt": "...",
//!       "primaryFolderId": 1001,
//!       "secondaryFolderId": "1002",
//!       "enabled": true
//!     }
//!   ]
//! }
//! ```

use crate::RouterError;
use async_trait::async_trait;
use ledgermail_domain::{Destination, RoutingRule, RuleSource};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Request timeout for rule fetches
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Rule source backed by a remote configuration endpoint
#[derive(Clone)]
pub struct HttpRuleSource {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl fmt::Debug for HttpRuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRuleSource")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Deserialize)]
struct ConfigsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    configs: Vec<RemoteRule>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteRule {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sender_match: String,
    #[serde(default)]
    subject_match: String,
    #[serde(default)]
    prompt: Option<String>,
    primary_folder_id: Value,
    #[serde(default)]
    secondary_folder_id: Option<Value>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Folder and rule ids arrive as either strings or numbers
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RemoteRule {
    fn into_rule(self, index: usize) -> Result<RoutingRule, RouterError> {
        let name = self
            .name
            .as_ref()
            .and_then(id_text)
            .or_else(|| self.id.as_ref().and_then(id_text))
            .unwrap_or_else(|| format!("rule-{}", index + 1));

        let primary_folder_id = id_text(&self.primary_folder_id).ok_or_else(|| {
            RouterError::Malformed(format!("rule '{}' has no primaryFolderId", name))
        })?;

        Ok(RoutingRule {
            name,
            match_sender: self.sender_match,
            match_subject: self.subject_match,
            enabled: self.enabled,
            prompt_template: self.prompt.unwrap_or_default(),
            destination: Destination {
                primary_folder_id,
                secondary_folder_id: self.secondary_folder_id.as_ref().and_then(id_text),
            },
        })
    }
}

/// Decode a `getConfigs` response body into rules
///
/// # Errors
///
/// `Malformed` when the body is not the expected JSON, `Rejected` when the
/// endpoint reports `success: false`.
pub fn parse_rules_response(body: &str) -> Result<Vec<RoutingRule>, RouterError> {
    let response: ConfigsResponse =
        serde_json::from_str(body).map_err(|e| RouterError::Malformed(e.to_string()))?;

    if !response.success {
        return Err(RouterError::Rejected(
            response
                .error
                .unwrap_or_else(|| "success flag not set".to_string()),
        ));
    }

    response
        .configs
        .into_iter()
        .enumerate()
        .map(|(i, remote)| remote.into_rule(i))
        .collect()
}

impl HttpRuleSource {
    /// Create a source for `url`, optionally authenticating with a bearer token
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, RouterError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(RouterError::Config("rule source URL is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| RouterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RuleSource for HttpRuleSource {
    type Error = RouterError;

    async fn fetch_rules(&self) -> Result<Vec<RoutingRule>, RouterError> {
        let mut request = self
            .client
            .get(&self.url)
            .query(&[("action", "getConfigs")]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RouterError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RouterError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(RouterError::Http(format!("status {}: {}", status, body)));
        }

        let rules = parse_rules_response(&body)?;
        debug!("Fetched {} rules from {}", rules.len(), self.url);
        Ok(rules)
    }
}
