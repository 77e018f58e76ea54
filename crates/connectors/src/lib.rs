//! # Connectors
//!
//! Concrete delivery channels implementing [`contracts::Connector`]:
//! - [`ChatBroadcastConnector`]: bot API chat broadcast
//! - [`SocialQueueConnector`]: queued social posts
//! - [`IssueTrackerConnector`]: repository issues
//! - [`WebhookConnector`]: generic JSON webhook
//!
//! Remote failures never surface as errors: every connector maps HTTP status,
//! transport errors and malformed responses into `ConnectorResult::failed`.
//! Only construction from a misconfigured `ConnectorConfig` returns an error.
//!
//! The `mock` feature adds [`mock::MockConnector`], a scripted test double.

pub mod chat_broadcast;
pub mod factory;
pub mod http;
pub mod issue_tracker;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod params;
pub mod social_queue;
pub mod webhook;

pub use chat_broadcast::{ChatBroadcastConfig, ChatBroadcastConnector};
pub use factory::{create_connector, create_connectors};
pub use http::{HttpCore, HttpReply, RATE_LIMITED};
pub use issue_tracker::{IssueTrackerConfig, IssueTrackerConnector};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockBehavior, MockConnector};
pub use params::DEFAULT_REQUEST_TIMEOUT;
pub use social_queue::{SocialQueueConfig, SocialQueueConnector};
pub use webhook::{WebhookConfig, WebhookConnector};
