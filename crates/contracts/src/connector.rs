//! Connector trait - Dispatcher output interface
//!
//! Defines the abstract interface every delivery channel adapter implements.

use async_trait::async_trait;

use crate::{ChannelKind, ConnectorResult, RenderedPayload};

/// Delivery channel adapter
///
/// Connectors are stored as `Arc<dyn Connector>` in the registry and called
/// concurrently for distinct payloads, so they hold no mutable state beyond
/// their credentials and HTTP client.
///
/// # Contract
/// - Ordinary remote failures (HTTP status, transport error, timeout,
///   malformed response) resolve to [`ConnectorResult::failed`].
/// - Misconfiguration is reported when the connector is constructed, not here.
/// - Exactly one outbound request per [`Connector::send`]; no retries.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Channel this connector delivers to
    fn kind(&self) -> ChannelKind;

    /// Human-readable name (used for logging/status)
    fn display_name(&self) -> &str;

    /// Deliver one rendered payload
    async fn send(&self, payload: &RenderedPayload) -> ConnectorResult;

    /// Lightweight reachability probe (authenticated no-op call)
    async fn probe(&self) -> ConnectorResult;
}
