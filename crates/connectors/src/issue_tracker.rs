//! IssueTrackerConnector - open an issue in a repository

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ChannelKind, Connector, ConnectorConfig, ConnectorResult, ContractError, RenderedPayload};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::http::{HttpCore, HttpReply, RATE_LIMITED};
use crate::params::Params;

/// Longest issue title sent to the tracker
pub const MAX_TITLE_CHARS: usize = 256;

/// Configuration for IssueTrackerConnector
#[derive(Debug, Clone)]
pub struct IssueTrackerConfig {
    /// API root, e.g. `https://api.github.com`
    pub base_url: String,
    /// `owner/name`
    pub repository: String,
    pub token: String,
    /// Labels added to every issue, merged with payload tags
    pub labels: Vec<String>,
    pub request_timeout: Duration,
}

impl IssueTrackerConfig {
    /// Create config from params map
    ///
    /// Params: `base_url`, `repository`, `token` | `token_env`, `labels`,
    /// `request_timeout_ms`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let p = Params::new(ChannelKind::IssueTracker, params);
        let repository = p.required("repository")?;
        let valid = repository
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !valid {
            return Err(ContractError::connector_config(
                ChannelKind::IssueTracker,
                format!("'repository' must be 'owner/name', got '{repository}'"),
            ));
        }
        Ok(Self {
            base_url: p.url("base_url")?,
            repository: repository.to_string(),
            token: p.secret("token")?,
            labels: p.list("labels"),
            request_timeout: p.request_timeout()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    number: u64,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Connector opening issues through a repository API
pub struct IssueTrackerConnector {
    name: String,
    config: IssueTrackerConfig,
    http: HttpCore,
}

impl IssueTrackerConnector {
    pub fn new(name: impl Into<String>, config: IssueTrackerConfig) -> Result<Self, ContractError> {
        let http = HttpCore::new(ChannelKind::IssueTracker, config.request_timeout)?;
        Ok(Self {
            name: name.into(),
            config,
            http,
        })
    }

    /// Create from connector configuration (for factory)
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ContractError> {
        Self::new(&config.display_name, IssueTrackerConfig::from_params(&config.params)?)
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}", self.config.base_url, self.config.repository)
    }

    fn build_body(&self, payload: &RenderedPayload) -> serde_json::Value {
        let mut labels = self.config.labels.clone();
        for tag in &payload.tags {
            if !labels.contains(tag) {
                labels.push(tag.clone());
            }
        }
        json!({
            "title": issue_title(payload),
            "body": payload.text,
            "labels": labels,
        })
    }

    fn interpret(reply: &HttpReply) -> ConnectorResult {
        if !reply.is_success() {
            if is_rate_limited(reply) {
                return ConnectorResult::failed(RATE_LIMITED);
            }
            return match reply.json::<ApiError>() {
                Ok(api) => ConnectorResult::failed(format!("HTTP {}: {}", reply.status.as_u16(), api.message)),
                Err(_) => ConnectorResult::failed(reply.failure_message()),
            };
        }
        match reply.json::<CreatedIssue>() {
            Ok(issue) => ConnectorResult::delivered(Some(
                issue
                    .html_url
                    .unwrap_or_else(|| format!("#{}", issue.number)),
            )),
            Err(e) => ConnectorResult::failed(e),
        }
    }
}

/// Payload title, else the first non-empty line of the text
fn issue_title(payload: &RenderedPayload) -> String {
    let raw = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| payload.text.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("Untitled");
    raw.chars().take(MAX_TITLE_CHARS).collect()
}

/// Secondary rate limits arrive as 403 with an exhausted quota header
fn is_rate_limited(reply: &HttpReply) -> bool {
    match reply.status.as_u16() {
        429 => true,
        403 => reply.header("x-ratelimit-remaining") == Some("0"),
        _ => false,
    }
}

#[async_trait]
impl Connector for IssueTrackerConnector {
    fn kind(&self) -> ChannelKind {
        ChannelKind::IssueTracker
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "issue_tracker_send",
        skip(self, payload),
        fields(connector = %self.name, repository = %self.config.repository)
    )]
    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult {
        let request = self
            .http
            .client()
            .post(format!("{}/issues", self.repo_url()))
            .bearer_auth(&self.config.token)
            .header("accept", "application/vnd.github+json")
            .json(&self.build_body(payload));

        let result = match self.http.execute(request).await {
            Ok(reply) => Self::interpret(&reply),
            Err(message) => ConnectorResult::failed(message),
        };

        if result.success {
            debug!(connector = %self.name, reference = ?result.reference, "Issue opened");
        } else {
            warn!(connector = %self.name, error = ?result.error_message, "Opening issue failed");
        }
        result
    }

    #[instrument(name = "issue_tracker_probe", skip(self), fields(connector = %self.name))]
    async fn probe(&self) -> ConnectorResult {
        let request = self
            .http
            .client()
            .get(self.repo_url())
            .bearer_auth(&self.config.token)
            .header("accept", "application/vnd.github+json");
        match self.http.execute(request).await {
            Ok(reply) if reply.is_success() => ConnectorResult::delivered(None),
            Ok(reply) if is_rate_limited(&reply) => ConnectorResult::failed(RATE_LIMITED),
            Ok(reply) => ConnectorResult::failed(reply.failure_message()),
            Err(message) => ConnectorResult::failed(message),
        }
    }
}
