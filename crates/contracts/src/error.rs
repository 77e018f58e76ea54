//! Layered error definitions
//!
//! Categorized by source: config / connector / envelope

use thiserror::Error;

use crate::ChannelKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Connector Errors =====
    /// Connector could not be constructed from its configuration
    #[error("connector '{channel}' misconfigured: {message}")]
    ConnectorConfig {
        channel: ChannelKind,
        message: String,
    },

    /// Unknown channel kind name
    #[error("unknown channel kind: {0}")]
    UnknownChannelKind(String),

    // ===== Envelope Errors =====
    /// Envelope failed to build
    #[error("invalid envelope: {message}")]
    InvalidEnvelope { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create connector configuration error
    pub fn connector_config(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::ConnectorConfig {
            channel,
            message: message.into(),
        }
    }

    /// Create envelope error
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message: message.into(),
        }
    }
}
