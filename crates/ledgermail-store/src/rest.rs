//! Signed REST client for the back-office document store
//!
//! Uploads go out as one JSON POST carrying the base64 document and,
//! optionally, the derived JSON:
//!
//! ```json
//! {
//!   "fileName": "2024-05-01T12-30-45-123Z_memo.pdf",
//!   "fileContent": "JVBERi0...",
//!   "jsonFileName": "2024-05-01T12-30-45-123Z_memo.json",
//!   "jsonContent": "{...}",
//!   "folderId": "1001",
//!   "secondaryFolderId": "1002"
//! }
//! ```
//!
//! The store answers `{ "success": true, "fileId": "..", "jsonFileId": ".." }`
//! or `{ "success": false, "error": ".." }`.

use crate::naming::ArchiveNames;
use crate::signing::{Nonce, OAuthCredentials};
use crate::StoreError;
use async_trait::async_trait;
use base64::Engine;
use ledgermail_domain::{DocumentSink, DocumentUpload, SinkReceipt, TransactionLookup};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// REST store settings (credentials are supplied separately)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestStoreConfig {
    /// Endpoint URL. Query parameters here are included in the signature.
    pub url: String,

    /// Request timeout in seconds
    /// Default: 60
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl RestStoreConfig {
    /// Config for `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(format!("store url must be http(s), got '{}'", self.url));
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    file_name: &'a str,
    file_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_content: Option<String>,
    folder_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary_folder_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    file_id: Option<Value>,
    #[serde(default)]
    json_file_id: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, alias = "results")]
    records: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split `url` into the part that is signed as-is and its query pairs
fn split_url(url: &str) -> (&str, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((base, query)) => {
            let pairs = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| {
                    let (k, v) = p.split_once('=').unwrap_or((p, ""));
                    let decode = |s: &str| {
                        urlencoding::decode(s)
                            .map(|c| c.into_owned())
                            .unwrap_or_else(|_| s.to_string())
                    };
                    (decode(k), decode(v))
                })
                .collect();
            (base, pairs)
        }
        None => (url, Vec::new()),
    }
}

/// Parse an upload response body into a receipt
fn parse_upload_response(body: &str) -> Result<SinkReceipt, StoreError> {
    let response: UploadResponse =
        serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))?;

    if !response.success {
        return Err(StoreError::Rejected(
            response
                .error
                .unwrap_or_else(|| "success flag not set".to_string()),
        ));
    }

    let primary_file_id = response
        .file_id
        .as_ref()
        .and_then(id_text)
        .ok_or_else(|| StoreError::Malformed("response has no fileId".to_string()))?;

    Ok(SinkReceipt {
        primary_file_id,
        secondary_file_id: response.json_file_id.as_ref().and_then(id_text),
    })
}

/// Signed client for uploads and transaction search
#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: reqwest::Client,
    base_url: String,
    base_query: Vec<(String, String)>,
    credentials: OAuthCredentials,
}

impl RestDocumentStore {
    /// Create a client
    ///
    /// # Errors
    ///
    /// `StoreError::Config` for an invalid config, incomplete credentials, or
    /// an HTTP client that cannot be built.
    pub fn new(config: RestStoreConfig, credentials: OAuthCredentials) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Config)?;
        if !credentials.is_complete() {
            return Err(StoreError::Config(
                "store credentials are incomplete".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StoreError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let (base_url, base_query) = split_url(&config.url);

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            base_query,
            credentials,
        })
    }

    fn authorize(&self, method: &str, extra: &[(&str, &str)]) -> (String, Vec<(String, String)>) {
        let query: Vec<(String, String)> = self
            .base_query
            .iter()
            .cloned()
            .chain(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .collect();
        let borrowed: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let header =
            self.credentials
                .authorization_header(method, &self.base_url, &borrowed, &Nonce::fresh());
        (header, query)
    }

    /// Upload `upload` under the stored names `names`
    pub async fn persist_as(
        &self,
        upload: &DocumentUpload<'_>,
        names: &ArchiveNames,
    ) -> Result<SinkReceipt, StoreError> {
        let json_content = upload.derived_json.map(serde_json::to_string).transpose()?;

        let body = UploadBody {
            file_name: &names.document,
            file_content: base64::engine::general_purpose::STANDARD.encode(upload.bytes),
            json_file_name: json_content.as_ref().map(|_| names.json.as_str()),
            json_content,
            folder_id: &upload.destination.primary_folder_id,
            secondary_folder_id: upload.destination.secondary_folder_id.as_deref(),
        };

        let (auth, query) = self.authorize("POST", &[]);
        let response = self
            .client
            .post(&self.base_url)
            .query(&query)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Http(format!("status {}: {}", status, text)));
        }

        let receipt = parse_upload_response(&text)?;
        info!(
            "Stored {} as file {} in folder {}",
            names.document, receipt.primary_file_id, upload.destination.primary_folder_id
        );
        Ok(receipt)
    }
}

#[async_trait]
impl DocumentSink for RestDocumentStore {
    type Error = StoreError;

    async fn persist(&self, upload: &DocumentUpload<'_>) -> Result<SinkReceipt, StoreError> {
        self.persist_as(upload, &ArchiveNames::now(upload.original_filename))
            .await
    }
}

#[async_trait]
impl TransactionLookup for RestDocumentStore {
    type Error = StoreError;

    async fn find_transaction(&self, field: &str, value: &str) -> Result<Option<Value>, StoreError> {
        let extra = [("action", "search"), ("field", field), ("value", value)];
        let (auth, query) = self.authorize("GET", &extra);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Http(format!("status {}: {}", status, text)));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))?;
        if !parsed.success {
            return Err(StoreError::Rejected(
                parsed.error.unwrap_or_else(|| "search failed".to_string()),
            ));
        }

        debug!("Search {}={} returned {} records", field, value, parsed.records.len());
        Ok(parsed.records.into_iter().next())
    }
}
