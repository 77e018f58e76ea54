//! Dispatcher error types

use contracts::ChannelKind;
use thiserror::Error;
use tokio::task::JoinError;

/// Precondition failures of `Dispatcher::distribute`
///
/// The only errors `distribute` returns: channel-level failures are recorded
/// as outcomes in the report instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No channels requested
    #[error("no channels requested")]
    EmptyChannelList,

    /// Requested channel has no registered connector
    #[error("channel '{0}' has no registered connector")]
    UnknownChannel(ChannelKind),

    /// Channel requested more than once
    #[error("channel '{0}' requested more than once")]
    DuplicateChannel(ChannelKind),
}

/// Connector registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A connector for this kind is already registered
    #[error("a connector for channel '{0}' is already registered")]
    DuplicateChannel(ChannelKind),

    /// No connector registered for this kind
    #[error("channel '{0}' has no registered connector")]
    UnknownChannel(ChannelKind),
}

/// Errors while assembling a dispatcher from configuration
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Connector creation error
    #[error("failed to create connector '{channel}': {message}")]
    ConnectorCreation {
        channel: ChannelKind,
        message: String,
    },

    /// Registry rejected a connector
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Template registry could not be built
    #[error("template error: {0}")]
    Template(#[from] templates::TemplateError),

    /// Contract error
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a connector creation error
    pub fn connector_creation(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::ConnectorCreation {
            channel,
            message: message.into(),
        }
    }
}

/// Human-readable reason for a failed task
pub(crate) fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return format!("task aborted: {err}");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("panicked: {message}")
}
