//! ChannelKind - closed set of delivery surfaces

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ContractError;

/// Delivery channel kind
///
/// Each kind maps to exactly one connector at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Broadcast to a chat channel through a bot API
    ChatBroadcast,
    /// Queue a post in a social media scheduler
    SocialQueue,
    /// Open an issue in an issue tracker
    IssueTracker,
    /// POST to a generic webhook endpoint
    Webhook,
}

impl ChannelKind {
    /// All known kinds, in declaration order
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::ChatBroadcast,
        ChannelKind::SocialQueue,
        ChannelKind::IssueTracker,
        ChannelKind::Webhook,
    ];

    /// Stable snake_case name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::ChatBroadcast => "chat_broadcast",
            ChannelKind::SocialQueue => "social_queue",
            ChannelKind::IssueTracker => "issue_tracker",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ContractError::UnknownChannelKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_dashes_and_case() {
        assert_eq!(
            "Chat-Broadcast".parse::<ChannelKind>().unwrap(),
            ChannelKind::ChatBroadcast
        );
        assert_eq!(
            "issue_tracker".parse::<ChannelKind>().unwrap(),
            ChannelKind::IssueTracker
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "carrier_pigeon".parse::<ChannelKind>().unwrap_err();
        assert!(err.to_string().contains("carrier_pigeon"));
    }

    #[test]
    fn test_serde_matches_display() {
        for kind in ChannelKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }
}
