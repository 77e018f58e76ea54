//! ChatBroadcastConnector - bot API broadcast to a chat channel

use async_trait::async_trait;
use contracts::{ChannelKind, Connector, ConnectorConfig, ConnectorResult, ContractError, RenderedPayload};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::http::{HttpCore, HttpReply, RATE_LIMITED};
use crate::params::Params;

/// Configuration for ChatBroadcastConnector
#[derive(Debug, Clone)]
pub struct ChatBroadcastConfig {
    /// API root, e.g. `https://api.telegram.org`
    pub base_url: String,
    /// Bot token (embedded in the request path)
    pub token: String,
    /// Default target chat (payload recipient overrides)
    pub chat_id: String,
    /// Optional parse mode (`MarkdownV2`, `HTML`)
    pub parse_mode: Option<String>,
    pub request_timeout: Duration,
}

impl ChatBroadcastConfig {
    /// Create config from params map
    ///
    /// Params: `base_url`, `token` | `token_env`, `chat_id`, `parse_mode`,
    /// `request_timeout_ms`.
    pub fn from_params(params: &std::collections::HashMap<String, String>) -> Result<Self, ContractError> {
        let p = Params::new(ChannelKind::ChatBroadcast, params);
        Ok(Self {
            base_url: p.url("base_url")?,
            token: p.secret("token")?,
            chat_id: p.required("chat_id")?.to_string(),
            parse_mode: p.optional("parse_mode").map(str::to_string),
            request_timeout: p.request_timeout()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Connector posting messages through a chat bot API
pub struct ChatBroadcastConnector {
    name: String,
    config: ChatBroadcastConfig,
    http: HttpCore,
}

impl ChatBroadcastConnector {
    pub fn new(name: impl Into<String>, config: ChatBroadcastConfig) -> Result<Self, ContractError> {
        let http = HttpCore::new(ChannelKind::ChatBroadcast, config.request_timeout)?;
        Ok(Self {
            name: name.into(),
            config,
            http,
        })
    }

    /// Create from connector configuration (for factory)
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ContractError> {
        Self::new(&config.display_name, ChatBroadcastConfig::from_params(&config.params)?)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.config.base_url, self.config.token, method)
    }

    fn build_body(&self, payload: &RenderedPayload) -> serde_json::Value {
        let chat_id = payload.recipient.as_deref().unwrap_or(&self.config.chat_id);
        let mut body = json!({
            "chat_id": chat_id,
            "text": payload.text,
            "disable_web_page_preview": false,
        });
        if let Some(mode) = &self.config.parse_mode {
            body["parse_mode"] = json!(mode);
        }
        body
    }

    /// Map a bot API reply; `ok:false` carries the reason in `description`
    fn interpret(reply: &HttpReply) -> ConnectorResult {
        if reply.status.as_u16() == 429 {
            return ConnectorResult::failed(RATE_LIMITED);
        }
        match reply.json::<BotResponse<SentMessage>>() {
            Ok(BotResponse {
                ok: true,
                result: Some(message),
                ..
            }) => ConnectorResult::delivered(Some(message.message_id.to_string())),
            Ok(BotResponse { ok: true, .. }) => ConnectorResult::failed("response missing message_id"),
            Ok(BotResponse { description, .. }) => {
                ConnectorResult::failed(description.unwrap_or_else(|| reply.failure_message()))
            }
            Err(_) if !reply.is_success() => ConnectorResult::failed(reply.failure_message()),
            Err(e) => ConnectorResult::failed(e),
        }
    }
}

#[async_trait]
impl Connector for ChatBroadcastConnector {
    fn kind(&self) -> ChannelKind {
        ChannelKind::ChatBroadcast
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "chat_broadcast_send",
        skip(self, payload),
        fields(connector = %self.name, chars = payload.text.chars().count())
    )]
    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult {
        let request = self
            .http
            .client()
            .post(self.method_url("sendMessage"))
            .json(&self.build_body(payload));

        let result = match self.http.execute(request).await {
            Ok(reply) => Self::interpret(&reply),
            Err(message) => ConnectorResult::failed(message),
        };

        if result.success {
            debug!(connector = %self.name, reference = ?result.reference, "Message broadcast");
        } else {
            warn!(connector = %self.name, error = ?result.error_message, "Broadcast failed");
        }
        result
    }

    #[instrument(name = "chat_broadcast_probe", skip(self), fields(connector = %self.name))]
    async fn probe(&self) -> ConnectorResult {
        let request = self.http.client().get(self.method_url("getMe"));
        match self.http.execute(request).await {
            Ok(reply) => match reply.json::<BotResponse<serde_json::Value>>() {
                Ok(BotResponse { ok: true, .. }) => ConnectorResult::delivered(None),
                Ok(BotResponse { description, .. }) => {
                    ConnectorResult::failed(description.unwrap_or_else(|| reply.failure_message()))
                }
                Err(_) if !reply.is_success() => ConnectorResult::failed(reply.failure_message()),
                Err(e) => ConnectorResult::failed(e),
            },
            Err(message) => ConnectorResult::failed(message),
        }
    }
}
