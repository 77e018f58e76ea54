//! Configuration validation
//!
//! Rules:
//! - field rules declared on the blueprint (`validator` derive)
//! - at least one connector, channel kinds unique
//! - display names not blank
//! - enabled connectors carry their required params
//! - default channels point at enabled connectors, each listed once
//! - variant keys unique and not blank
//! - variant templates only target configured channels
//! - the selection policy only names registered variants
//! - channel templates have a format and a positive `max_chars`

use std::collections::HashSet;

use contracts::{ChannelKind, ConnectorConfig, ContractError, DistributionBlueprint};
use validator::Validate;

/// Validate a DistributionBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_connectors(blueprint)?;
    validate_connector_params(blueprint)?;
    validate_default_channels(blueprint)?;
    validate_variants(blueprint)?;
    validate_policy(blueprint)?;
    Ok(())
}

/// Declarative field rules
fn validate_fields(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// Connector list: non-empty, unique kinds, named
fn validate_connectors(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    if blueprint.connectors.is_empty() {
        return Err(ContractError::config_validation(
            "connectors",
            "at least one connector must be configured",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, connector) in blueprint.connectors.iter().enumerate() {
        if !seen.insert(connector.kind) {
            return Err(ContractError::config_validation(
                format!("connectors[{idx}].kind"),
                format!("duplicate channel kind '{}'", connector.kind),
            ));
        }
        if connector.display_name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("connectors[{idx}].display_name"),
                "display name cannot be blank",
            ));
        }
    }
    Ok(())
}

/// A required param: plain key, or a secret that may come from `<key>_env`
#[derive(Clone, Copy)]
enum Required {
    Plain(&'static str),
    Secret(&'static str),
}

/// Params each channel kind cannot be built without
///
/// Value formats (urls, repository names) are checked when the connector is
/// built.
fn required_params(kind: ChannelKind) -> &'static [Required] {
    use Required::{Plain, Secret};
    match kind {
        ChannelKind::ChatBroadcast => &[Plain("base_url"), Secret("token"), Plain("chat_id")],
        ChannelKind::SocialQueue => &[
            Plain("base_url"),
            Secret("access_token"),
            Plain("profile_ids"),
        ],
        ChannelKind::IssueTracker => &[Plain("base_url"), Plain("repository"), Secret("token")],
        ChannelKind::Webhook => &[Plain("url")],
    }
}

fn has_param(connector: &ConnectorConfig, key: &str) -> bool {
    connector
        .params
        .get(key)
        .is_some_and(|v| !v.trim().is_empty())
}

/// Enabled connectors must carry every required param
fn validate_connector_params(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    for (idx, connector) in blueprint.connectors.iter().enumerate() {
        if !connector.enabled {
            continue;
        }
        for required in required_params(connector.kind) {
            let (present, wanted) = match *required {
                Required::Plain(key) => (has_param(connector, key), format!("'{key}'")),
                Required::Secret(key) => (
                    has_param(connector, key) || has_param(connector, &format!("{key}_env")),
                    format!("'{key}' or '{key}_env'"),
                ),
            };
            if !present {
                return Err(ContractError::config_validation(
                    format!("connectors[{idx}].params"),
                    format!("{} connector requires {wanted}", connector.kind),
                ));
            }
        }
    }
    Ok(())
}

/// `dispatch.default_channels` must name enabled connectors, each once
fn validate_default_channels(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    let enabled: HashSet<_> = blueprint.enabled_connectors().map(|c| c.kind).collect();
    let mut seen = HashSet::new();
    for kind in &blueprint.dispatch.default_channels {
        if !enabled.contains(kind) {
            return Err(ContractError::config_validation(
                "dispatch.default_channels",
                format!("channel '{kind}' has no enabled connector"),
            ));
        }
        if !seen.insert(*kind) {
            return Err(ContractError::config_validation(
                "dispatch.default_channels",
                format!("channel '{kind}' listed more than once"),
            ));
        }
    }
    Ok(())
}

/// Variant keys and their channel templates
fn validate_variants(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    let configured: HashSet<_> = blueprint.connectors.iter().map(|c| c.kind).collect();
    let mut seen = HashSet::new();
    for (idx, variant) in blueprint.templates.variants.iter().enumerate() {
        if variant.key.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("templates.variants[{idx}].key"),
                "variant key cannot be blank",
            ));
        }
        if !seen.insert(variant.key.as_str()) {
            return Err(ContractError::config_validation(
                format!("templates.variants[key={}]", variant.key),
                "duplicate variant key",
            ));
        }
        for (kind, template) in &variant.channels {
            if !configured.contains(kind) {
                return Err(ContractError::config_validation(
                    format!("templates.variants[{}].channels.{kind}", variant.key),
                    format!("no connector configured for channel '{kind}'"),
                ));
            }
            if template.format.is_empty() {
                return Err(ContractError::config_validation(
                    format!("templates.variants[{}].channels.{kind}.format", variant.key),
                    "format cannot be empty",
                ));
            }
            if template.max_chars == Some(0) {
                return Err(ContractError::config_validation(
                    format!(
                        "templates.variants[{}].channels.{kind}.max_chars",
                        variant.key
                    ),
                    "max_chars must be > 0",
                ));
            }
        }
    }
    Ok(())
}

/// Policy must only reference registered variants
///
/// A blueprint without variants relies on pre-rendered envelopes only, so the
/// policy is not checked in that case.
fn validate_policy(blueprint: &DistributionBlueprint) -> Result<(), ContractError> {
    let templates = &blueprint.templates;
    if templates.variants.is_empty() {
        return Ok(());
    }

    let referenced = templates.policy.referenced_variants();
    if referenced.is_empty() {
        return Err(ContractError::config_validation(
            "templates.policy",
            "policy must reference at least one variant",
        ));
    }

    let known: HashSet<_> = templates.variants.iter().map(|v| v.key.as_str()).collect();
    for key in referenced {
        if !known.contains(key) {
            return Err(ContractError::config_validation(
                "templates.policy",
                format!("policy references unknown variant '{key}'"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_toml;

    const BASE: &str = r#"
[[connectors]]
kind = "webhook"
display_name = "Hook"
params = { url = "https://hooks.example.com/in" }
"#;

    fn load(extra: &str) -> Result<(), ContractError> {
        let bp = parse_toml(&format!("{BASE}{extra}")).unwrap();
        validate(&bp)
    }

    #[test]
    fn test_minimal_is_valid() {
        assert!(load("").is_ok());
    }

    #[test]
    fn test_duplicate_kind() {
        let err = load(
            r#"
[[connectors]]
kind = "webhook"
display_name = "Hook again"
params = { url = "https://hooks.example.com/other" }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate channel kind"));
    }

    #[test]
    fn test_blank_display_name() {
        let bp = parse_toml(
            r#"
[[connectors]]
kind = "webhook"
display_name = "   "
"#,
        )
        .unwrap();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load("[dispatch]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_default_channel_without_connector() {
        let err = load("[dispatch]\ndefault_channels = [\"issue_tracker\"]\n").unwrap_err();
        assert!(err.to_string().contains("issue_tracker"));
    }

    #[test]
    fn test_policy_unknown_variant() {
        let err = load(
            r#"
[templates.policy]
type = "fixed"
variant = "missing"

[[templates.variants]]
key = "default"
[templates.variants.channels.webhook]
format = "{body}"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown variant 'missing'"));
    }

    #[test]
    fn test_duplicate_variant_key() {
        let err = load(
            r#"
[[templates.variants]]
key = "default"
[[templates.variants]]
key = "default"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate variant key"));
    }

    #[test]
    fn test_zero_max_chars() {
        let err = load(
            r#"
[[templates.variants]]
key = "default"
[templates.variants.channels.webhook]
format = "{body}"
max_chars = 0
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_chars"));
    }

    #[test]
    fn test_no_variants_skips_policy_check() {
        assert!(load("[templates.policy]\ntype = \"fixed\"\nvariant = \"nowhere\"\n").is_ok());
    }

    #[test]
    fn test_duplicate_default_channel() {
        let err = load("[dispatch]\ndefault_channels = [\"webhook\", \"webhook\"]\n").unwrap_err();
        assert!(err.to_string().contains("listed more than once"));
    }

    #[test]
    fn test_missing_required_param() {
        let err = load(
            r#"
[[connectors]]
kind = "chat_broadcast"
display_name = "Chat"
params = { base_url = "https://chat.example.com", token = "t" }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires 'chat_id'"));
    }

    #[test]
    fn test_secret_param_from_env_name() {
        assert!(load(
            r#"
[[connectors]]
kind = "issue_tracker"
display_name = "Tracker"
params = { base_url = "https://tracker.example.com", repository = "acme/site", token_env = "TRACKER_TOKEN" }
"#,
        )
        .is_ok());
        let err = load(
            r#"
[[connectors]]
kind = "issue_tracker"
display_name = "Tracker"
params = { base_url = "https://tracker.example.com", repository = "acme/site" }
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'token' or 'token_env'"));
    }

    #[test]
    fn test_disabled_connector_params_not_required() {
        assert!(load(
            r#"
[[connectors]]
kind = "social_queue"
display_name = "Social"
enabled = false
"#,
        )
        .is_ok());
    }

    #[test]
    fn test_variant_channel_without_connector() {
        let err = load(
            r#"
[[templates.variants]]
key = "default"
[templates.variants.channels.webhook]
format = "{body}"
[templates.variants.channels.issue_tracker]
format = "{body}"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no connector configured for channel 'issue_tracker'"));
    }
}
