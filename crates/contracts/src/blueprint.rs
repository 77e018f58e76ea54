//! DistributionBlueprint - Config Loader output
//!
//! Describes the full distribution setup: dispatch options, connectors and
//! template variants.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use validator::Validate;

use crate::ChannelKind;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete distribution configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DistributionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Fan-out behavior
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// One entry per channel kind
    #[validate(nested)]
    pub connectors: Vec<ConnectorConfig>,

    /// Template variants and selection policy
    #[serde(default)]
    pub templates: TemplatesConfig,
}

impl DistributionBlueprint {
    /// Connectors with `enabled = true`
    pub fn enabled_connectors(&self) -> impl Iterator<Item = &ConnectorConfig> {
        self.connectors.iter().filter(|c| c.enabled)
    }

    /// Channels to target when the caller names none: `dispatch.default_channels`
    /// if set, otherwise every enabled connector in declaration order
    pub fn default_channels(&self) -> Vec<ChannelKind> {
        if self.dispatch.default_channels.is_empty() {
            self.enabled_connectors().map(|c| c.kind).collect()
        } else {
            self.dispatch.default_channels.clone()
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Per-send timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Health probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    #[validate(range(min = 1))]
    pub probe_timeout_ms: u64,

    /// Maximum simultaneous sends per request (None = unbounded)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_in_flight: Option<usize>,

    /// Channels used when a request names none
    #[serde(default)]
    pub default_channels: Vec<ChannelKind>,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            max_in_flight: None,
            default_channels: Vec::new(),
        }
    }
}

/// Connector configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConnectorConfig {
    /// Channel kind (unique across the blueprint)
    pub kind: ChannelKind,

    /// Display name
    #[validate(length(min = 1))]
    pub display_name: String,

    /// Disabled connectors are not registered
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Connector-specific parameters (base_url, token / token_env, ...)
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Default variant selection when a request names no variant
    #[serde(default)]
    pub policy: VariantPolicyConfig,

    /// Registered variants
    #[serde(default)]
    pub variants: Vec<VariantConfig>,
}

/// Variant selection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantPolicyConfig {
    /// Always use one variant
    Fixed { variant: String },
    /// Fixed assignment per channel, with a fallback
    PerChannel {
        #[serde(default)]
        assignments: BTreeMap<ChannelKind, String>,
        fallback: String,
    },
    /// Stable split across variants keyed on the envelope id
    Split { variants: Vec<String> },
}

impl Default for VariantPolicyConfig {
    fn default() -> Self {
        Self::Fixed {
            variant: "default".to_string(),
        }
    }
}

impl VariantPolicyConfig {
    /// Every variant key the policy can select
    pub fn referenced_variants(&self) -> Vec<&str> {
        match self {
            Self::Fixed { variant } => vec![variant.as_str()],
            Self::PerChannel {
                assignments,
                fallback,
            } => assignments
                .values()
                .map(String::as_str)
                .chain(std::iter::once(fallback.as_str()))
                .collect(),
            Self::Split { variants } => variants.iter().map(String::as_str).collect(),
        }
    }
}

/// One template variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Variant key (unique)
    pub key: String,

    /// Per-channel templates
    #[serde(default)]
    pub channels: BTreeMap<ChannelKind, ChannelTemplateConfig>,
}

/// Template for one channel within a variant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTemplateConfig {
    /// Text template, e.g. `"{title}\n\n{body}\n{link}"`
    pub format: String,

    /// Optional title template
    #[serde(default)]
    pub title: Option<String>,

    /// Optional recipient override
    #[serde(default)]
    pub recipient: Option<String>,

    /// Truncate rendered text to this many characters
    #[serde(default)]
    pub max_chars: Option<usize>,
}
