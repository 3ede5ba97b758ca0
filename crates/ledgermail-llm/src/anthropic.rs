//! Anthropic Messages API oracle
//!
//! Sends one user turn holding a base64 PDF document block followed by the
//! instruction text, and returns the concatenated text blocks of the reply.
//!
//! # Examples
//!
//! ```no_run
//! use ledgermail_llm::{AnthropicConfig, AnthropicOracle};
//!
//! let config = AnthropicConfig::default();
//! let oracle = AnthropicOracle::new(config, "sk-ant-...").unwrap();
//! ```

use crate::LlmError;
use async_trait::async_trait;
use base64::Engine;
use ledgermail_domain::{ExtractionOracle, OracleRequest, OracleResponse, TokenUsage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Default API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";

/// API version header value
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Timeout recommended for upload-style calls
pub const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Oracle client settings (the API key is supplied separately)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Output cap used when a request does not set one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// `anthropic-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout. Unset for extraction calls, which rely on the API's own limits.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            timeout_secs: None,
        }
    }
}

/// Oracle backed by the Messages API
#[derive(Clone)]
pub struct AnthropicOracle {
    config: AnthropicConfig,
    api_key: String,
    client: reqwest::Client,
}

impl fmt::Debug for AnthropicOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicOracle")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Document { source: DocumentSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct DocumentSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicOracle {
    /// Create a client
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if the key is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: AnthropicConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Model identifier in use
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body<'a>(&'a self, request: &'a OracleRequest<'a>) -> MessagesRequest<'a> {
        let mut content = Vec::with_capacity(2);
        if let Some(document) = request.document {
            content.push(ContentBlock::Document {
                source: DocumentSource {
                    kind: "base64",
                    media_type: document.media_type,
                    data: base64::engine::general_purpose::STANDARD.encode(document.bytes),
                },
            });
        }
        content.push(ContentBlock::Text {
            text: request.instructions,
        });

        MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_output_tokens.unwrap_or(self.config.max_tokens),
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl ExtractionOracle for AnthropicOracle {
    type Error = LlmError;

    async fn complete(&self, request: &OracleRequest<'_>) -> Result<OracleResponse, Self::Error> {
        let url = format!("{}/v1/messages", self.config.endpoint.trim_end_matches('/'));
        let body = self.build_body(request);

        debug!(
            "Calling oracle model {} ({} instruction chars, document: {})",
            self.config.model,
            request.instructions.len(),
            request.document.is_some()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited(text));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default();

        info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Oracle call complete"
        );

        Ok(OracleResponse { text, usage })
    }
}
