//! Channel metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{DistributionOutcome, FailureReason};
use serde::Serialize;

/// In-process counters for a single channel
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// Connector calls started
    attempts: AtomicU64,
    /// Successful deliveries
    delivered: AtomicU64,
    /// Render, connector and panic failures
    failed: AtomicU64,
    /// Calls that exceeded the per-call timeout
    timed_out: AtomicU64,
    /// Channels skipped by cancellation
    cancelled: AtomicU64,
}

impl ChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Count a finished outcome in the matching bucket
    pub fn record(&self, outcome: &DistributionOutcome) {
        let counter = match outcome.failure {
            None => &self.delivered,
            Some(FailureReason::Timeout) => &self.timed_out,
            Some(FailureReason::Cancelled) => &self.cancelled,
            Some(FailureReason::Render | FailureReason::Connector | FailureReason::Panicked) => {
                &self.failed
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts(),
            delivered: self.delivered(),
            failed: self.failed(),
            timed_out: self.timed_out(),
            cancelled: self.cancelled(),
        }
    }
}

/// Snapshot of channel metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub delivered: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use contracts::{ChannelKind, ConnectorResult};

    #[test]
    fn test_record_buckets() {
        let metrics = ChannelMetrics::new();
        let now = Utc::now();
        let kind = ChannelKind::Webhook;

        metrics.inc_attempts();
        metrics.record(&DistributionOutcome::from_result(
            kind,
            ConnectorResult::delivered(None),
            None,
            now,
        ));
        metrics.inc_attempts();
        metrics.record(&DistributionOutcome::timed_out(kind, None, now));
        metrics.record(&DistributionOutcome::cancelled(kind, now));
        metrics.record(&DistributionOutcome::failed(kind, FailureReason::Render, "x", now));

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                attempts: 2,
                delivered: 1,
                failed: 1,
                timed_out: 1,
                cancelled: 1,
            }
        );
    }
}
