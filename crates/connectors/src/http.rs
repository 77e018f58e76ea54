//! Shared HTTP plumbing for connectors
//!
//! Turns every transport or status failure into a message string so that
//! connectors can hand back `ConnectorResult::failed` without ever erroring.

use std::time::Duration;

use contracts::{ChannelKind, ContractError};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Message used for provider-side rate limiting
pub const RATE_LIMITED: &str = "rate_limited";

const USER_AGENT: &str = concat!("fanout/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP client wrapper owned by one connector
#[derive(Debug, Clone)]
pub struct HttpCore {
    channel: ChannelKind,
    client: Client,
}

impl HttpCore {
    /// Build a client with the given request timeout
    pub fn new(channel: ChannelKind, timeout: Duration) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ContractError::connector_config(channel, format!("http client: {e}")))?;
        Ok(Self { channel, client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Execute a request and read the whole body
    ///
    /// Err carries a message fit for `ConnectorResult::failed`.
    pub async fn execute(&self, request: RequestBuilder) -> Result<HttpReply, String> {
        let response = request.send().await.map_err(describe_transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read response body: {}", e.without_url()))?;

        debug!(channel = %self.channel, status = status.as_u16(), "HTTP reply");

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

/// Buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_str(&self.body).map_err(|e| {
            format!(
                "malformed response ({}): {e}: {}",
                self.status.as_u16(),
                snippet(&self.body)
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Generic failure message for a non-success status
    pub fn failure_message(&self) -> String {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            return RATE_LIMITED.to_string();
        }
        format!("HTTP {}: {}", self.status.as_u16(), snippet(&self.body))
    }
}

/// The URL is stripped: some providers carry credentials in the path
fn describe_transport_error(e: reqwest::Error) -> String {
    let e = e.without_url();
    if e.is_timeout() {
        "timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        format!("request failed: {e}")
    }
}

/// First characters of a body, for error messages
pub fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
    out.push_str("...");
    out
}
