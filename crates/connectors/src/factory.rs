//! Connector factory
//!
//! Resolves a `ConnectorConfig` to a concrete connector once, at
//! registration time.

use std::sync::Arc;

use contracts::{ChannelKind, Connector, ConnectorConfig, ContractError, DistributionBlueprint};
use tracing::{debug, instrument};

use crate::{ChatBroadcastConnector, IssueTrackerConnector, SocialQueueConnector, WebhookConnector};

/// Create a connector from configuration
#[instrument(
    name = "connectors_create_connector",
    skip(config),
    fields(connector = %config.display_name, kind = %config.kind)
)]
pub fn create_connector(config: &ConnectorConfig) -> Result<Arc<dyn Connector>, ContractError> {
    let connector: Arc<dyn Connector> = match config.kind {
        ChannelKind::ChatBroadcast => Arc::new(ChatBroadcastConnector::from_config(config)?),
        ChannelKind::SocialQueue => Arc::new(SocialQueueConnector::from_config(config)?),
        ChannelKind::IssueTracker => Arc::new(IssueTrackerConnector::from_config(config)?),
        ChannelKind::Webhook => Arc::new(WebhookConnector::from_config(config)?),
    };
    debug!("Connector created");
    Ok(connector)
}

/// Create every enabled connector of a blueprint, in declaration order
pub fn create_connectors(blueprint: &DistributionBlueprint) -> Result<Vec<Arc<dyn Connector>>, ContractError> {
    blueprint
        .enabled_connectors()
        .map(create_connector)
        .collect()
}
