//! SocialQueueConnector - queue a post on one or more social profiles

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use contracts::{ChannelKind, Connector, ConnectorConfig, ConnectorResult, ContractError, RenderedPayload};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::http::{HttpCore, HttpReply};
use crate::params::Params;

/// Configuration for SocialQueueConnector
#[derive(Debug, Clone)]
pub struct SocialQueueConfig {
    pub base_url: String,
    pub access_token: String,
    /// Profiles the post is queued on
    pub profile_ids: Vec<String>,
    /// Post immediately instead of queueing
    pub now: bool,
    pub request_timeout: Duration,
}

impl SocialQueueConfig {
    /// Create config from params map
    ///
    /// Params: `base_url`, `access_token` | `access_token_env`,
    /// `profile_ids` (comma-separated), `now`, `request_timeout_ms`.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ContractError> {
        let p = Params::new(ChannelKind::SocialQueue, params);
        let profile_ids = p.list("profile_ids");
        if profile_ids.is_empty() {
            return Err(ContractError::connector_config(
                ChannelKind::SocialQueue,
                "'profile_ids' must list at least one profile",
            ));
        }
        let now = match p.optional("now") {
            Some(raw) => raw.parse::<bool>().map_err(|_| {
                ContractError::connector_config(ChannelKind::SocialQueue, format!("invalid 'now' value '{raw}'"))
            })?,
            None => false,
        };
        Ok(Self {
            base_url: p.url("base_url")?,
            access_token: p.secret("access_token")?,
            profile_ids,
            now,
            request_timeout: p.request_timeout()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    updates: Vec<QueuedUpdate>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueuedUpdate {
    id: String,
}

/// Connector queueing posts through a social scheduling API
pub struct SocialQueueConnector {
    name: String,
    config: SocialQueueConfig,
    http: HttpCore,
}

impl SocialQueueConnector {
    pub fn new(name: impl Into<String>, config: SocialQueueConfig) -> Result<Self, ContractError> {
        let http = HttpCore::new(ChannelKind::SocialQueue, config.request_timeout)?;
        Ok(Self {
            name: name.into(),
            config,
            http,
        })
    }

    /// Create from connector configuration (for factory)
    pub fn from_config(config: &ConnectorConfig) -> Result<Self, ContractError> {
        Self::new(&config.display_name, SocialQueueConfig::from_params(&config.params)?)
    }

    /// Form fields; a payload recipient narrows the post to that profile
    fn form(&self, payload: &RenderedPayload) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = match &payload.recipient {
            Some(profile) => vec![("profile_ids[]", profile.clone())],
            None => self
                .config
                .profile_ids
                .iter()
                .map(|id| ("profile_ids[]", id.clone()))
                .collect(),
        };
        fields.push(("text", payload.text.clone()));
        fields.push(("now", self.config.now.to_string()));
        fields
    }

    fn interpret(reply: &HttpReply) -> ConnectorResult {
        if !reply.is_success() {
            return match reply.json::<CreateResponse>() {
                Ok(CreateResponse {
                    message: Some(message),
                    ..
                }) if reply.status.as_u16() != 429 => ConnectorResult::failed(message),
                _ => ConnectorResult::failed(reply.failure_message()),
            };
        }
        match reply.json::<CreateResponse>() {
            Ok(response) if response.success => {
                ConnectorResult::delivered(response.updates.into_iter().next().map(|u| u.id))
            }
            Ok(response) => ConnectorResult::failed(
                response
                    .message
                    .unwrap_or_else(|| "update was not queued".to_string()),
            ),
            Err(e) => ConnectorResult::failed(e),
        }
    }
}

#[async_trait]
impl Connector for SocialQueueConnector {
    fn kind(&self) -> ChannelKind {
        ChannelKind::SocialQueue
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "social_queue_send",
        skip(self, payload),
        fields(connector = %self.name, profiles = self.config.profile_ids.len())
    )]
    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult {
        let request = self
            .http
            .client()
            .post(format!("{}/updates/create.json", self.config.base_url))
            .bearer_auth(&self.config.access_token)
            .form(&self.form(payload));

        let result = match self.http.execute(request).await {
            Ok(reply) => Self::interpret(&reply),
            Err(message) => ConnectorResult::failed(message),
        };

        if result.success {
            debug!(connector = %self.name, reference = ?result.reference, "Post queued");
        } else {
            warn!(connector = %self.name, error = ?result.error_message, "Queueing post failed");
        }
        result
    }

    #[instrument(name = "social_queue_probe", skip(self), fields(connector = %self.name))]
    async fn probe(&self) -> ConnectorResult {
        let request = self
            .http
            .client()
            .get(format!("{}/user.json", self.config.base_url))
            .bearer_auth(&self.config.access_token);
        match self.http.execute(request).await {
            Ok(reply) if reply.is_success() => ConnectorResult::delivered(None),
            Ok(reply) => ConnectorResult::failed(reply.failure_message()),
            Err(message) => ConnectorResult::failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn connector(base_url: &str) -> SocialQueueConnector {
        SocialQueueConnector::new(
            "Social",
            SocialQueueConfig {
                base_url: base_url.to_string(),
                access_token: "abc".into(),
                profile_ids: vec!["p1".into(), "p2".into()],
                now: false,
                request_timeout: Duration::from_secs(5),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_config_requires_profiles() {
        let params: HashMap<String, String> = [
            ("base_url", "https://social.example.com/1"),
            ("access_token", "abc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let err = SocialQueueConfig::from_params(&params).unwrap_err();
        assert!(err.to_string().contains("profile_ids"));
    }

    #[test]
    fn test_form_fields() {
        let c = connector("https://social.example.com");
        let fields = c.form(&RenderedPayload::text(ChannelKind::SocialQueue, "hello"));
        assert_eq!(
            fields,
            vec![
                ("profile_ids[]", "p1".to_string()),
                ("profile_ids[]", "p2".to_string()),
                ("text", "hello".to_string()),
                ("now", "false".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_send_success_returns_first_update_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/updates/create.json")
            .match_header("authorization", "Bearer abc")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("text".into(), "launch day".into()),
                Matcher::UrlEncoded("now".into(), "false".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"success":true,"updates":[{"id":"u-1"},{"id":"u-2"}]}"#)
            .create_async()
            .await;

        let result = connector(&server.url())
            .send(&RenderedPayload::text(ChannelKind::SocialQueue, "launch day"))
            .await;

        assert_eq!(result, ConnectorResult::delivered(Some("u-1".into())));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_not_queued() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/updates/create.json")
            .with_status(200)
            .with_body(r#"{"success":false,"message":"Duplicate update"}"#)
            .create_async()
            .await;

        let result = connector(&server.url())
            .send(&RenderedPayload::text(ChannelKind::SocialQueue, "x"))
            .await;
        assert_eq!(result.error_message.as_deref(), Some("Duplicate update"));
    }

    #[tokio::test]
    async fn test_send_http_error_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/updates/create.json")
            .with_status(401)
            .with_body(r#"{"message":"Invalid access token"}"#)
            .create_async()
            .await;

        let result = connector(&server.url())
            .send(&RenderedPayload::text(ChannelKind::SocialQueue, "x"))
            .await;
        assert_eq!(result.error_message.as_deref(), Some("Invalid access token"));
    }

    #[tokio::test]
    async fn test_send_malformed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/updates/create.json")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let result = connector(&server.url())
            .send(&RenderedPayload::text(ChannelKind::SocialQueue, "x"))
            .await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().starts_with("malformed response"));
    }

    #[tokio::test]
    async fn test_probe() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/user.json")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_body(r#"{"id":"me"}"#)
            .create_async()
            .await;

        assert!(connector(&server.url()).probe().await.success);
    }
}
