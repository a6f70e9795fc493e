// client.rs
use crate::domain::ApiCredentials;
use crate::upstream::UpstreamError;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::IgnoredAny;
use std::time::Duration;

const USER_AGENT: &str = concat!("listing-sync/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "X-Api-Key";
const ERROR_BODY_EXCERPT: usize = 200;

/// Authenticated GET against the listings API.
///
/// Success yields the response text exactly as received, already checked to
/// be well-formed JSON. Implementations never retry; the caller decides what
/// a failure means.
pub trait Upstream: Send + Sync {
    fn fetch(&self, url: &str, creds: &ApiCredentials) -> Result<String, UpstreamError>;
}

pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Upstream for HttpUpstream {
    fn fetch(&self, url: &str, creds: &ApiCredentials) -> Result<String, UpstreamError> {
        let resp = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &creds.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", creds.bearer_token))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown Status");
            let excerpt: String = text.trim().chars().take(ERROR_BODY_EXCERPT).collect();
            let message = if excerpt.is_empty() {
                format!("API request failed: {reason}")
            } else {
                format!("API request failed: {reason} ({excerpt})")
            };
            return Err(UpstreamError::Status {
                status_code: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<IgnoredAny>(&text)
            .map_err(|e| UpstreamError::InvalidBody(e.to_string()))?;
        Ok(text)
    }
}
