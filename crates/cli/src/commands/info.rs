//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ChannelKind, DistributionBlueprint, VariantPolicyConfig};

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatch: DispatchInfo,
    connectors: Vec<ConnectorInfo>,
    policy: VariantPolicyConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    variants: Vec<VariantInfo>,
}

#[derive(Serialize)]
struct DispatchInfo {
    timeout_ms: u64,
    probe_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_in_flight: Option<usize>,
    default_channels: Vec<ChannelKind>,
}

#[derive(Serialize)]
struct ConnectorInfo {
    kind: ChannelKind,
    display_name: String,
    enabled: bool,
    /// Param names only, values may hold secrets
    params: Vec<String>,
}

#[derive(Serialize)]
struct VariantInfo {
    key: String,
    channels: Vec<TemplateInfo>,
}

#[derive(Serialize)]
struct TemplateInfo {
    channel: ChannelKind,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_chars: Option<usize>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    info!(config = %args.config.display(), "Showing configuration info");

    let config_info = build_info(&blueprint, args.templates);

    if args.json {
        let json =
            serde_json::to_string_pretty(&config_info).context("Failed to serialize info")?;
        println!("{json}");
    } else {
        print_info(&config_info);
    }

    Ok(())
}

fn build_info(blueprint: &DistributionBlueprint, with_templates: bool) -> ConfigInfo {
    let connectors = blueprint
        .connectors
        .iter()
        .map(|c| {
            let mut params: Vec<String> = c.params.keys().cloned().collect();
            params.sort();
            ConnectorInfo {
                kind: c.kind,
                display_name: c.display_name.clone(),
                enabled: c.enabled,
                params,
            }
        })
        .collect();

    let variants = if with_templates {
        blueprint
            .templates
            .variants
            .iter()
            .map(|v| VariantInfo {
                key: v.key.clone(),
                channels: v
                    .channels
                    .iter()
                    .map(|(kind, t)| TemplateInfo {
                        channel: *kind,
                        format: t.format.clone(),
                        max_chars: t.max_chars,
                    })
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        dispatch: DispatchInfo {
            timeout_ms: blueprint.dispatch.timeout_ms,
            probe_timeout_ms: blueprint.dispatch.probe_timeout_ms,
            max_in_flight: blueprint.dispatch.max_in_flight,
            default_channels: blueprint.default_channels(),
        },
        connectors,
        policy: blueprint.templates.policy.clone(),
        variants,
    }
}

fn print_info(info: &ConfigInfo) {
    println!("\n=== Configuration Info ===\n");
    println!("Version: {}", info.version);

    println!("\nDispatch:");
    println!("  Send timeout: {} ms", info.dispatch.timeout_ms);
    println!("  Probe timeout: {} ms", info.dispatch.probe_timeout_ms);
    match info.dispatch.max_in_flight {
        Some(limit) => println!("  Max in flight: {limit}"),
        None => println!("  Max in flight: unbounded"),
    }
    let defaults: Vec<&str> = info
        .dispatch
        .default_channels
        .iter()
        .map(ChannelKind::as_str)
        .collect();
    println!("  Default channels: {}", defaults.join(", "));

    println!("\nConnectors ({}):", info.connectors.len());
    for connector in &info.connectors {
        let state = if connector.enabled { "" } else { " (disabled)" };
        println!(
            "  - {} [{}]{state}",
            connector.display_name,
            connector.kind.as_str()
        );
        if !connector.params.is_empty() {
            println!("    params: {}", connector.params.join(", "));
        }
    }

    println!("\nVariant policy: {}", describe_policy(&info.policy));

    if !info.variants.is_empty() {
        println!("\nVariants ({}):", info.variants.len());
        for variant in &info.variants {
            println!("  - {}", variant.key);
            for template in &variant.channels {
                print!("    {}: {:?}", template.channel.as_str(), template.format);
                if let Some(max) = template.max_chars {
                    print!(" (max {max} chars)");
                }
                println!();
            }
        }
    }
}

fn describe_policy(policy: &VariantPolicyConfig) -> String {
    match policy {
        VariantPolicyConfig::Fixed { variant } => format!("fixed '{variant}'"),
        VariantPolicyConfig::PerChannel {
            assignments,
            fallback,
        } => {
            let parts: Vec<String> = assignments
                .iter()
                .map(|(kind, key)| format!("{kind}={key}"))
                .collect();
            format!("per channel [{}], fallback '{fallback}'", parts.join(", "))
        }
        VariantPolicyConfig::Split { variants } => format!("split {variants:?}"),
    }
}
