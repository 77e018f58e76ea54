//! `distribute` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use contracts::{ContentEnvelope, DistributionReport};
use dispatcher::{create_dispatcher, DispatchOptions};
use observability::DistributionStatsAggregator;

use super::load_blueprint;
use crate::cli::DistributeArgs;

/// Execute the `distribute` command
///
/// Fails (non-zero exit) when any channel did not succeed.
pub async fn run_distribute(args: &DistributeArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.config)?;
    let dispatcher = create_dispatcher(&blueprint).context("Failed to set up connectors")?;

    let envelope = build_envelope(args)?;
    let channels = if args.channels.is_empty() {
        blueprint.default_channels()
    } else {
        args.channels.clone()
    };

    let cancel = CancellationToken::new();
    let mut options = DispatchOptions::new().with_cancel(cancel.clone());
    if let Some(variant) = &args.variant {
        options = options.with_variant(variant);
    }
    if let Some(ms) = args.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }
    if let Some(limit) = args.max_in_flight {
        options = options.with_max_in_flight(limit);
    }

    info!(
        envelope_id = %envelope.id(),
        channels = ?channels,
        variant = ?args.variant,
        "Distributing"
    );

    let signal = tokio::spawn(cancel_on_shutdown(cancel));
    let result = dispatcher.distribute(&envelope, &channels, options).await;
    signal.abort();
    let report = result.context("Distribution rejected")?;

    observability::record_report(&report);
    observability::record_connector_states(&dispatcher.status().connectors);

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    if report.is_complete_success() {
        Ok(())
    } else {
        let failed: Vec<String> = report
            .failed_channels()
            .iter()
            .map(ToString::to_string)
            .collect();
        anyhow::bail!(
            "{} of {} channels failed: {}",
            report.failed(),
            report.len(),
            failed.join(", ")
        )
    }
}

fn build_envelope(args: &DistributeArgs) -> Result<ContentEnvelope> {
    let body = match (&args.body, &args.body_file) {
        (Some(body), _) => body.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read body from {}", path.display()))?,
        (None, None) => String::new(),
    };

    let mut builder = ContentEnvelope::builder()
        .title(&args.title)
        .body(body)
        .tags(&args.tags);
    if let Some(id) = &args.id {
        builder = builder.id(id.as_str());
    }
    if let Some(link) = &args.link {
        builder = builder.link(link);
    }
    for (key, value) in &args.metadata {
        builder = builder.metadata(key, value);
    }
    builder.build().context("Invalid content")
}

/// Cancel not-yet-started channels on Ctrl+C or SIGTERM
async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, cancelling channels not yet started");
    cancel.cancel();
}

fn print_report(report: &DistributionReport) {
    println!("\n=== Distribution {} ===\n", report.request_id());
    for outcome in report.outcomes() {
        let mark = if outcome.success { "✓" } else { "✗" };
        let variant = outcome.variant.as_deref().unwrap_or("-");
        let detail = outcome.detail.as_deref().unwrap_or("");
        match outcome.failure {
            Some(reason) => println!(
                "  {mark} {:<14} [{variant}] {reason}: {detail}",
                outcome.channel.as_str()
            ),
            None => println!("  {mark} {:<14} [{variant}] {detail}", outcome.channel.as_str()),
        }
    }

    let mut aggregator = DistributionStatsAggregator::new();
    aggregator.update(report);
    println!("\n{}", aggregator.summary());
}
