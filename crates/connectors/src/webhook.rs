//! WebhookConnector - generic JSON POST to a URL

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ChannelKind, Connector, ConnectorConfig, ConnectorResult, ContractError, RenderedPayload};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::http::HttpCore;
use crate::params::Params;

/// Configuration for WebhookConnector
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    /// Full `Authorization` header value, e.g. `Bearer xyz`
    pub auth_header: Option<String>,
    pub request_timeout: Duration,
}

impl WebhookConfig {
    /// Create config from params map
    ///
    /// Params: `url`, `auth_header` | `auth_header_env`, `request_timeout_ms`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let p = Params::new(ChannelKind::Webhook, params);
        Ok(Self {
            url: p.url("url")?,
            auth_header: p.optional_secret("auth_header")?,
            request_timeout: p.request_timeout()?,
        })
    }
}

/// Connector posting a JSON document to an arbitrary endpoint
pub struct WebhookConnector {
    name: String,
    config: WebhookConfig,
    http: HttpCore,
}

impl WebhookConnector {
    pub fn new(name: impl Into<String>, config: WebhookConfig) -> Result<Self, ContractError> {
        let http = HttpCore::new(ChannelKind::Webhook, config.request_timeout)?;
        Ok(Self {
            name: name.into(),
            config,
            http,
        })
    }

    /// Create from connector configuration (for factory)
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ContractError> {
        Self::new(&config.display_name, WebhookConfig::from_params(&config.params)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_header {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }
}

#[async_trait]
impl Connector for WebhookConnector {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "webhook_send", skip(self, payload), fields(connector = %self.name))]
    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult {
        let body = json!({
            "text": payload.text,
            "title": payload.title,
            "tags": payload.tags,
            "variant": payload.variant,
        });
        let request = self.authorize(self.http.client().post(&self.config.url).json(&body));

        let result = match self.http.execute(request).await {
            Ok(reply) if reply.is_success() => {
                let reference = reply
                    .header("x-request-id")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", reply.status.as_u16()));
                ConnectorResult::delivered(Some(reference))
            }
            Ok(reply) => ConnectorResult::failed(reply.failure_message()),
            Err(message) => ConnectorResult::failed(message),
        };

        if result.success {
            debug!(connector = %self.name, reference = ?result.reference, "Webhook delivered");
        } else {
            warn!(connector = %self.name, error = ?result.error_message, "Webhook failed");
        }
        result
    }

    /// Reachability only: any status below 500 counts
    #[instrument(name = "webhook_probe", skip(self), fields(connector = %self.name))]
    async fn probe(&self) -> ConnectorResult {
        let request = self.authorize(self.http.client().head(&self.config.url));
        match self.http.execute(request).await {
            Ok(reply) if !reply.status.is_server_error() => ConnectorResult::delivered(None),
            Ok(reply) => ConnectorResult::failed(reply.failure_message()),
            Err(message) => ConnectorResult::failed(message),
        }
    }
}
