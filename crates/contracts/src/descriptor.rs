//! ConnectorDescriptor - last-known health of one registered channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ChannelKind;

/// Health descriptor owned by the connector registry
///
/// `active` reflects only the most recent probe or send attempt. It is a
/// point-in-time hint for status display and ordering, not a guarantee of
/// deliverability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    pub kind: ChannelKind,
    pub display_name: String,
    pub active: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ConnectorDescriptor {
    /// Fresh descriptor: never checked, not active
    pub fn new(kind: ChannelKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            active: false,
            last_checked_at: None,
            last_error: None,
        }
    }

    /// Apply an attempt result
    ///
    /// Returns false (and changes nothing) when `at` is older than the last
    /// recorded check.
    pub fn apply(&mut self, success: bool, error: Option<String>, at: DateTime<Utc>) -> bool {
        if self.last_checked_at.is_some_and(|last| at < last) {
            return false;
        }
        self.active = success;
        self.last_checked_at = Some(at);
        self.last_error = if success { None } else { error };
        true
    }
}
