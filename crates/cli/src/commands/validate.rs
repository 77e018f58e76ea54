//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ChannelKind, DistributionBlueprint};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    connector_count: usize,
    enabled_connectors: Vec<ChannelKind>,
    default_channels: Vec<ChannelKind>,
    variant_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |errors: Vec<String>| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        errors,
        warnings: Vec::new(),
        summary: None,
    };

    if !args.config.exists() {
        return invalid(vec![format!("File not found: {}", args.config.display())]);
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => return invalid(vec![e.to_string()]),
    };

    // Param values (urls, repository names) are checked when the connector is built
    let errors: Vec<String> = blueprint
        .enabled_connectors()
        .filter_map(|config| connectors::create_connector(config).err())
        .map(|e| e.to_string())
        .collect();

    ValidationResult {
        valid: errors.is_empty(),
        config_path: config_path.clone(),
        errors,
        warnings: collect_warnings(&blueprint),
        summary: Some(ConfigSummary {
            version: format!("{:?}", blueprint.version),
            connector_count: blueprint.connectors.len(),
            enabled_connectors: blueprint.enabled_connectors().map(|c| c.kind).collect(),
            default_channels: blueprint.default_channels(),
            variant_count: blueprint.templates.variants.len(),
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DistributionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.enabled_connectors().next().is_none() {
        warnings.push("All connectors are disabled - nothing can be distributed".to_string());
    }

    if blueprint.templates.variants.is_empty() {
        warnings.push(
            "No template variants configured - only pre-rendered content can be sent".to_string(),
        );
    }

    for variant in &blueprint.templates.variants {
        for connector in blueprint.enabled_connectors() {
            if !variant.channels.contains_key(&connector.kind) {
                warnings.push(format!(
                    "Variant '{}' has no template for channel '{}'",
                    variant.key, connector.kind
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        for error in &result.errors {
            println!("\n  Error: {error}");
        }
    }

    if let Some(ref summary) = result.summary {
        println!("\n  Version: {}", summary.version);
        println!(
            "  Connectors: {} ({} enabled)",
            summary.connector_count,
            summary.enabled_connectors.len()
        );
        println!("  Default channels: {}", join(&summary.default_channels));
        println!("  Template variants: {}", summary.variant_count);
    }

    if !result.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
}

fn join(kinds: &[ChannelKind]) -> String {
    kinds
        .iter()
        .map(ChannelKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
[[connectors]]
kind = "webhook"
display_name = "Hook"
params = { url = "https://hooks.example.com/in" }

[[connectors]]
kind = "chat_broadcast"
display_name = "Chat"
params = { base_url = "https://chat.example.com", token = "t", chat_id = "@news" }

[[templates.variants]]
key = "default"
channels.webhook = { format = "{title}: {body}" }
"#;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn check(content: &str) -> ValidationResult {
        let file = write_config(content);
        validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        })
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let result = check(CONFIG);

        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.summary.as_ref().unwrap().enabled_connectors.len(), 2);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no template for channel 'chat_broadcast'")));
    }

    #[test]
    fn test_missing_param_reported() {
        let result = check(&CONFIG.replace(r#", chat_id = "@news""#, ""));

        assert!(!result.valid);
        assert!(result.errors[0].contains("chat_id"), "{:?}", result.errors);
    }

    #[test]
    fn test_connector_build_errors_reported() {
        let result = check(&CONFIG.replace("https://chat.example.com", "not a url"));

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("base_url"), "{:?}", result.errors);
        assert!(result.summary.is_some());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/fanout.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.summary.is_none());
    }
}
