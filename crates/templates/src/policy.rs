//! Variant selection policy
//!
//! Decides which variant renders a channel when the request names none.
//! Every policy is a pure function of (envelope id, channel).

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use contracts::{ChannelKind, ContentEnvelope, VariantPolicyConfig};

/// Default variant selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantPolicy {
    /// Always the same variant
    Fixed(String),
    /// Per-channel assignment with a fallback
    PerChannel {
        assignments: BTreeMap<ChannelKind, String>,
        fallback: String,
    },
    /// Stable split: the envelope id picks one bucket for all channels
    Split(Vec<String>),
}

impl VariantPolicy {
    /// Select a variant key
    ///
    /// Returns None only for an empty split.
    pub fn select(&self, envelope: &ContentEnvelope, kind: ChannelKind) -> Option<&str> {
        match self {
            Self::Fixed(key) => Some(key.as_str()),
            Self::PerChannel {
                assignments,
                fallback,
            } => Some(assignments.get(&kind).unwrap_or(fallback).as_str()),
            Self::Split(keys) => {
                if keys.is_empty() {
                    return None;
                }
                let bucket = stable_bucket(envelope.id().as_str(), keys.len());
                keys.get(bucket).map(String::as_str)
            }
        }
    }
}

impl Default for VariantPolicy {
    fn default() -> Self {
        Self::Fixed("default".to_string())
    }
}

impl From<&VariantPolicyConfig> for VariantPolicy {
    fn from(config: &VariantPolicyConfig) -> Self {
        match config {
            VariantPolicyConfig::Fixed { variant } => Self::Fixed(variant.clone()),
            VariantPolicyConfig::PerChannel {
                assignments,
                fallback,
            } => Self::PerChannel {
                assignments: assignments.clone(),
                fallback: fallback.clone(),
            },
            VariantPolicyConfig::Split { variants } => Self::Split(variants.clone()),
        }
    }
}

/// Bucket index from a SHA-256 of the key (stable across runs and builds)
fn stable_bucket(key: &str, buckets: usize) -> usize {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % buckets as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(id: &str) -> ContentEnvelope {
        ContentEnvelope::builder().id(id).body("b").build().unwrap()
    }

    #[test]
    fn test_fixed() {
        let policy = VariantPolicy::Fixed("long".into());
        assert_eq!(policy.select(&envelope("e1"), ChannelKind::Webhook), Some("long"));
    }

    #[test]
    fn test_per_channel_fallback() {
        let policy = VariantPolicy::PerChannel {
            assignments: BTreeMap::from([(ChannelKind::SocialQueue, "short".to_string())]),
            fallback: "long".into(),
        };
        let env = envelope("e1");
        assert_eq!(policy.select(&env, ChannelKind::SocialQueue), Some("short"));
        assert_eq!(policy.select(&env, ChannelKind::IssueTracker), Some("long"));
    }

    #[test]
    fn test_split_is_stable_and_channel_independent() {
        let policy = VariantPolicy::Split(vec!["a".into(), "b".into(), "c".into()]);
        let env = envelope("release-2024-10");
        let first = policy.select(&env, ChannelKind::ChatBroadcast);
        assert!(first.is_some());
        for _ in 0..10 {
            assert_eq!(policy.select(&env, ChannelKind::ChatBroadcast), first);
        }
        assert_eq!(policy.select(&env, ChannelKind::Webhook), first);
    }

    #[test]
    fn test_split_spreads_ids() {
        let policy = VariantPolicy::Split(vec!["a".into(), "b".into()]);
        let picked: std::collections::HashSet<_> = (0..64)
            .map(|i| {
                policy
                    .select(&envelope(&format!("e{i}")), ChannelKind::Webhook)
                    .map(str::to_string)
            })
            .collect();
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_empty_split() {
        let policy = VariantPolicy::Split(Vec::new());
        assert_eq!(policy.select(&envelope("e1"), ChannelKind::Webhook), None);
    }
}
