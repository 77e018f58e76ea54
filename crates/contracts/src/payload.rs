//! Connector input and output values

use serde::{Deserialize, Serialize};

use crate::ChannelKind;

/// Channel-specific rendered content handed to a connector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPayload {
    /// Target channel
    pub channel: ChannelKind,

    /// Variant that produced this payload (None for pre-rendered text)
    #[serde(default)]
    pub variant: Option<String>,

    /// Main text body
    pub text: String,

    /// Optional title (issue title, message headline)
    #[serde(default)]
    pub title: Option<String>,

    /// Tags/labels to attach
    #[serde(default)]
    pub tags: Vec<String>,

    /// Optional recipient override (chat id, profile id, ...)
    #[serde(default)]
    pub recipient: Option<String>,
}

impl RenderedPayload {
    /// Plain-text payload without metadata
    pub fn text(channel: ChannelKind, text: impl Into<String>) -> Self {
        Self {
            channel,
            variant: None,
            text: text.into(),
            title: None,
            tags: Vec::new(),
            recipient: None,
        }
    }
}

/// Result of one connector call
///
/// Remote failures are data, never errors: see [`crate::Connector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorResult {
    pub success: bool,
    /// Opaque provider reference (message id, issue URL, ...)
    pub reference: Option<String>,
    pub error_message: Option<String>,
}

impl ConnectorResult {
    /// Successful delivery with an optional provider reference
    pub fn delivered(reference: Option<String>) -> Self {
        Self {
            success: true,
            reference,
            error_message: None,
        }
    }

    /// Failed delivery
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            reference: None,
            error_message: Some(message.into()),
        }
    }

    /// Reference on success, error message on failure
    pub fn detail(&self) -> Option<String> {
        if self.success {
            self.reference.clone()
        } else {
            self.error_message.clone()
        }
    }
}
