//! Distribution metrics
//!
//! Emits outcome and health metrics through the `metrics` facade and keeps
//! an in-memory aggregate for run summaries.

use std::collections::BTreeMap;

use contracts::{ChannelKind, ConnectorDescriptor, DistributionOutcome, DistributionReport};
use metrics::{counter, gauge, histogram};

/// Record every outcome of a finished report
///
/// # Example
///
/// ```ignore
/// let report = dispatcher.distribute(&envelope, &channels, options).await?;
/// observability::metrics::record_report(&report);
/// ```
pub fn record_report(report: &DistributionReport) {
    counter!("fanout_distributions_total").increment(1);
    histogram!("fanout_distribution_duration_ms")
        .record(report.duration().num_milliseconds().max(0) as f64);

    for outcome in report.outcomes() {
        record_outcome(outcome);
    }
}

/// Record one channel outcome
pub fn record_outcome(outcome: &DistributionOutcome) {
    counter!(
        "fanout_outcomes_total",
        "channel" => outcome.channel.as_str(),
        "status" => outcome_status(outcome)
    )
    .increment(1);

    if let Some(latency_ms) = outcome.latency_ms {
        histogram!(
            "fanout_send_latency_ms",
            "channel" => outcome.channel.as_str()
        )
        .record(latency_ms as f64);
    }
}

/// Record a health probe result
pub fn record_health_probe(channel: ChannelKind, active: bool) {
    let status = if active { "active" } else { "inactive" };
    counter!(
        "fanout_health_probes_total",
        "channel" => channel.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Publish the current `active` flag of every connector
pub fn record_connector_states(descriptors: &BTreeMap<ChannelKind, ConnectorDescriptor>) {
    for (kind, descriptor) in descriptors {
        gauge!("fanout_connector_active", "channel" => kind.as_str())
            .set(if descriptor.active { 1.0 } else { 0.0 });
    }
}

/// Status label: `delivered` or the failure reason
fn outcome_status(outcome: &DistributionOutcome) -> String {
    match outcome.failure {
        None if outcome.success => "delivered".to_string(),
        None => "failed".to_string(),
        Some(reason) => reason.to_string(),
    }
}

/// Distribution statistics aggregator
///
/// Aggregates reports in memory to print a summary.
#[derive(Debug, Clone, Default)]
pub struct DistributionStatsAggregator {
    /// Reports seen
    pub total_reports: u64,

    /// Reports where every channel succeeded
    pub complete_reports: u64,

    /// Outcomes per channel
    pub channels: BTreeMap<ChannelKind, ChannelTally>,

    /// Connector latency (ms)
    pub latency_stats: RunningStats,

    /// Whole-distribution duration (ms)
    pub duration_stats: RunningStats,
}

/// Outcome counts of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelTally {
    pub delivered: u64,
    pub failed: u64,
}

impl DistributionStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one report into the aggregate
    pub fn update(&mut self, report: &DistributionReport) {
        self.total_reports += 1;
        if report.is_complete_success() {
            self.complete_reports += 1;
        }
        self.duration_stats
            .push(report.duration().num_milliseconds().max(0) as f64);

        for outcome in report.outcomes() {
            let tally = self.channels.entry(outcome.channel).or_default();
            if outcome.success {
                tally.delivered += 1;
            } else {
                tally.failed += 1;
            }
            if let Some(latency_ms) = outcome.latency_ms {
                self.latency_stats.push(latency_ms as f64);
            }
        }
    }

    /// Generate summary report
    pub fn summary(&self) -> DistributionSummary {
        let delivered: u64 = self.channels.values().map(|t| t.delivered).sum();
        let failed: u64 = self.channels.values().map(|t| t.failed).sum();
        let attempted = delivered + failed;
        DistributionSummary {
            total_reports: self.total_reports,
            complete_reports: self.complete_reports,
            delivered,
            failed,
            success_rate: if attempted > 0 {
                delivered as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            duration_ms: StatsSummary::from(&self.duration_stats),
            channels: self.channels.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Distribution summary
#[derive(Debug, Clone, Default)]
pub struct DistributionSummary {
    pub total_reports: u64,
    pub complete_reports: u64,
    pub delivered: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub duration_ms: StatsSummary,
    pub channels: BTreeMap<ChannelKind, ChannelTally>,
}

impl std::fmt::Display for DistributionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Distribution Summary ===")?;
        writeln!(
            f,
            "Distributions: {} ({} fully delivered)",
            self.total_reports, self.complete_reports
        )?;
        writeln!(
            f,
            "Deliveries: {} ok, {} failed ({:.2}% success)",
            self.delivered, self.failed, self.success_rate
        )?;
        writeln!(f, "Send latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Duration (ms): {}", self.duration_ms)?;

        if !self.channels.is_empty() {
            writeln!(f, "Per channel:")?;
            for (kind, tally) in &self.channels {
                writeln!(f, "  {}: {} ok, {} failed", kind, tally.delivered, tally.failed)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::{ConnectorResult, ReportBuilder};
    use std::time::Duration;

    fn report() -> DistributionReport {
        let now = Utc::now();
        let mut builder = ReportBuilder::new("e1".into(), 2);
        builder.push(
            DistributionOutcome::from_result(
                ChannelKind::ChatBroadcast,
                ConnectorResult::delivered(Some("42".into())),
                None,
                now,
            )
            .with_latency(Duration::from_millis(120)),
        );
        builder.push(
            DistributionOutcome::from_result(
                ChannelKind::IssueTracker,
                ConnectorResult::failed("rate_limited"),
                None,
                now,
            )
            .with_latency(Duration::from_millis(80)),
        );
        builder.finish()
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DistributionStatsAggregator::new();
        aggregator.update(&report());

        assert_eq!(aggregator.total_reports, 1);
        assert_eq!(aggregator.complete_reports, 0);
        assert_eq!(
            aggregator.channels[&ChannelKind::ChatBroadcast],
            ChannelTally {
                delivered: 1,
                failed: 0
            }
        );
        assert_eq!(aggregator.channels[&ChannelKind::IssueTracker].failed, 1);
        assert_eq!(aggregator.latency_stats.count(), 2);
        assert!((aggregator.latency_stats.mean() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DistributionStatsAggregator::new();
        aggregator.update(&report());
        let output = aggregator.summary().to_string();

        assert!(output.contains("Deliveries: 1 ok, 1 failed (50.00% success)"));
        assert!(output.contains("issue_tracker: 0 ok, 1 failed"));
    }

    #[test]
    fn test_outcome_status_labels() {
        let now = Utc::now();
        let ok = DistributionOutcome::from_result(
            ChannelKind::Webhook,
            ConnectorResult::delivered(None),
            None,
            now,
        );
        assert_eq!(outcome_status(&ok), "delivered");
        assert_eq!(
            outcome_status(&DistributionOutcome::timed_out(ChannelKind::Webhook, None, now)),
            "timeout"
        );
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_report(&report());
        record_health_probe(ChannelKind::Webhook, false);
    }
}
