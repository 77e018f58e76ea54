//! `status` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use dispatcher::{create_dispatcher, DispatcherStatus};

use super::load_blueprint;
use crate::cli::StatusArgs;

/// Execute the `status` command
///
/// Without `--probe` every connector reads as never checked: health is only
/// known after a probe or a delivery attempt in this process.
pub async fn run_status(args: &StatusArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let dispatcher = create_dispatcher(&blueprint).context("Failed to set up connectors")?;

    let status = if args.probe {
        info!(connectors = dispatcher.registry().len(), "Probing connectors");
        let status = dispatcher.refresh_status().await;
        for (kind, descriptor) in &status.connectors {
            observability::record_health_probe(*kind, descriptor.active);
        }
        status
    } else {
        dispatcher.status()
    };
    observability::record_connector_states(&status.connectors);

    if args.json {
        let json = serde_json::to_string_pretty(&status).context("Failed to serialize status")?;
        println!("{json}");
    } else {
        print_status(&status);
    }

    if args.probe && !status.healthy {
        anyhow::bail!("No connector is active");
    }
    Ok(())
}

fn print_status(status: &DispatcherStatus) {
    println!("\n=== Connector Status ===\n");
    for (kind, descriptor) in &status.connectors {
        let state = match (descriptor.active, descriptor.last_checked_at) {
            (_, None) => "unchecked",
            (true, Some(_)) => "active",
            (false, Some(_)) => "inactive",
        };
        print!("  {:<14} {:<22} {state}", kind.as_str(), descriptor.display_name);
        if let Some(at) = descriptor.last_checked_at {
            print!(" (checked {})", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        println!();
        if let Some(error) = &descriptor.last_error {
            println!("  {:<14} last error: {error}", "");
        }
    }
    println!(
        "\nOverall: {}",
        if status.healthy { "healthy" } else { "unhealthy" }
    );
}
