//! OAuth 1.0a request signing (HMAC-SHA256, token-based)
//!
//! The signature covers the method, the URL without its query string, and
//! every query and `oauth_*` parameter, percent-encoded per RFC 3986 and
//! sorted. JSON request bodies are not part of the signature.

use base64::Engine;
use chrono::Utc;
use ring::hmac;
use std::fmt;
use urlencoding::encode;
use uuid::Uuid;

/// Signature method advertised in the header
pub const SIGNATURE_METHOD: &str = "HMAC-SHA256";

/// Consumer and token credentials
#[derive(Clone)]
pub struct OAuthCredentials {
    /// Consumer key
    pub consumer_key: String,
    /// Consumer secret
    pub consumer_secret: String,
    /// Access token id
    pub token_id: String,
    /// Access token secret
    pub token_secret: String,
    /// Realm (account id), sent unsigned in the header when set
    pub realm: Option<String>,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("token_id", &self.token_id)
            .field("token_secret", &"<redacted>")
            .field("realm", &self.realm)
            .finish()
    }
}

/// Per-request timestamp and nonce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// Unique value for this request
    pub value: String,
}

impl Nonce {
    /// Current time and a random v4 UUID
    pub fn fresh() -> Self {
        Self {
            timestamp: Utc::now().timestamp(),
            value: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// `METHOD&enc(url)&enc(sorted params)`
pub fn signature_base_string(method: &str, base_url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k).into_owned(), encode(v).into_owned()))
        .collect();
    encoded.sort();

    let joined = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url),
        encode(&joined)
    )
}

/// Base64 HMAC-SHA256 of `base` keyed by `enc(consumer_secret)&enc(token_secret)`
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key_material = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let key = hmac::Key::new(hmac::HMAC_SHA256, key_material.as_bytes());
    let tag = hmac::sign(&key, base.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(tag.as_ref())
}

impl OAuthCredentials {
    /// Whether every credential is present
    pub fn is_complete(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.token_id,
            &self.token_secret,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }

    /// `Authorization` header value for one request
    pub fn authorization_header(
        &self,
        method: &str,
        base_url: &str,
        query: &[(&str, &str)],
        nonce: &Nonce,
    ) -> String {
        let timestamp = nonce.timestamp.to_string();
        let oauth = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_token", self.token_id.as_str()),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_nonce", nonce.value.as_str()),
            ("oauth_version", "1.0"),
        ];

        let params: Vec<(&str, &str)> = query.iter().copied().chain(oauth).collect();
        let base = signature_base_string(method, base_url, &params);
        let signature = sign(&base, &self.consumer_secret, &self.token_secret);

        let mut parts = Vec::with_capacity(8);
        if let Some(realm) = &self.realm {
            parts.push(format!("realm=\"{}\"", encode(realm)));
        }
        for (k, v) in oauth {
            parts.push(format!("{}=\"{}\"", k, encode(v)));
        }
        parts.push(format!("oauth_signature=\"{}\"", encode(&signature)));

        format!("OAuth {}", parts.join(","))
    }
}
